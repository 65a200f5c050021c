fn main() {
    shortsguard_lib::run()
}
