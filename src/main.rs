fn main() {
    if let Err(err) = desc_export::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
