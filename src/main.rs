//! fast-forward binary entry point.

fn main() {
    std::process::exit(fast_forward::cli::run());
}
