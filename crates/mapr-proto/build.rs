//! Build script for mapr-proto
//!
//! Compiles the P4Runtime protobuf definitions using tonic-prost-build.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_root = "../../proto";

    let protos = [
        "google/rpc/status.proto",
        "p4/config/v1/p4info.proto",
        "p4/v1/p4data.proto",
        "p4/v1/p4runtime.proto",
    ];

    let proto_paths: Vec<_> = protos
        .iter()
        .map(|p| format!("{proto_root}/{p}"))
        .collect();

    // Vendored protoc ships the well-known types (google/protobuf/any.proto).
    let wkt_include = protoc_bin_vendored::include_path()?;
    let mut config = prost_build::Config::new();
    config.protoc_executable(protoc_bin_vendored::protoc_bin_path()?);

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_with_config(
            config,
            &proto_paths,
            &[proto_root.to_string(), wkt_include.display().to_string()],
        )?;

    println!("cargo:rerun-if-changed={proto_root}");

    Ok(())
}
