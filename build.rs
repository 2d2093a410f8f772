// build.rs: expose the compile-time target triple as a rustc env var.
//
// Cargo provides the `TARGET` env var to build scripts. We re-export it as
// `cargo:rustc-env=TARGET=...` so the runtime can derive the host OS family
// (and with it the dynamic library suffix and copy command) via
// `env!("TARGET")`.

fn main() {
    let target = std::env::var("TARGET")
        .expect("TARGET env var not set by Cargo. This should never happen in a normal build.");

    println!("cargo:rustc-env=TARGET={target}");
}
