/// Compiles `proto/sessionq.proto` into gRPC client and server bindings with
/// `tonic-prost-build`, and writes the encoded file descriptor set used by
/// the server's reflection service.
///
/// Generated code is pulled in by `src/lib.rs` through
/// `tonic::include_proto!("sessionq")`.
use std::env;
use std::path::PathBuf;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("sessionq_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/sessionq.proto"], &["proto"])
        .unwrap();
}
