fn main() {
    versus_matchup_lib::run()
}
