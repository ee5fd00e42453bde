fn main() {
    shorthand::cli::run();
}
