fn main() {
    println!("cargo:rerun-if-changed=../aid-ebpf/src/aid_lsm.bpf.rs");
    println!("cargo:rerun-if-changed=../aid-ebpf/Cargo.toml");
    println!("cargo:rerun-if-changed=../aid-common/src");

    #[cfg(feature = "ebpf")]
    {
        use std::path::PathBuf;
        use std::process::Command;

        let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap();
        let ebpf_dir = PathBuf::from(&manifest_dir).join("../aid-ebpf");
        let ebpf_manifest = ebpf_dir.join("Cargo.toml");
        let out_dir = std::env::var("OUT_DIR").unwrap();
        let target_dir = PathBuf::from(&out_dir).join("ebpf-target");

        println!("cargo:warning=Building LSM probes from {:?}", ebpf_dir);

        let arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_else(|_| "x86_64".to_string());
        let cargo = std::env::var("CARGO").unwrap_or_else(|_| "cargo".to_string());
        let status = Command::new(&cargo)
            .args([
                "build",
                "--manifest-path",
                ebpf_manifest.to_str().unwrap(),
                "-Z",
                "build-std=core",
                "--target",
                "bpfel-unknown-none",
                "--release",
                "--bin",
                "aid_lsm",
                "--target-dir",
                target_dir.to_str().unwrap(),
            ])
            .env_remove("RUSTC")
            .env_remove("RUSTC_WORKSPACE_WRAPPER")
            .env(
                "CARGO_ENCODED_RUSTFLAGS",
                format!("--cfg=bpf_target_arch=\"{}\"", arch),
            )
            .status()
            .expect("Failed to execute cargo build for eBPF");

        if !status.success() {
            panic!("Failed to build eBPF object aid_lsm");
        }

        let object = target_dir.join("bpfel-unknown-none/release/aid_lsm");
        println!("cargo:rustc-env=AID_EBPF_OBJECT={}", object.display());
    }
}
