//! nova-ext operator tool.

fn main() {
    if let Err(e) = nova_ext::cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
