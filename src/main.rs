fn main() {
    if let Err(err) = flow_diagram::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
