fn main() {
    std::process::exit(testrail_reporter::run());
}
