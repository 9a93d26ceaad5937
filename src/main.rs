fn main() {
    if let Err(err) = erd_canvas::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
