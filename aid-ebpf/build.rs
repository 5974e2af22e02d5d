// Generates Rust bindings for the kernel structs the probes dereference.
//
// The layouts come from the running kernel's BTF, so the object must be built
// on (or for) the kernel it will be loaded into.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

/// Kernel types read by the probes.
const KERNEL_TYPES: &[&str] = &[
    "task_struct",
    "cred",
    "file",
    "path",
    "dentry",
    "inode",
    "super_block",
    "sockaddr",
    "sockaddr_in",
];

const BTF_PATH: &str = "/sys/kernel/btf/vmlinux";

fn main() {
    println!("cargo:rerun-if-changed={}", BTF_PATH);
    println!("cargo:rerun-if-env-changed=AYA_TOOL");

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let aya_tool = env::var("AYA_TOOL").unwrap_or_else(|_| "aya-tool".to_string());

    let output = Command::new(&aya_tool)
        .arg("generate")
        .args(KERNEL_TYPES)
        .output()
        .unwrap_or_else(|e| {
            panic!(
                "failed to run {} (install with `cargo install --git https://github.com/aya-rs/aya -- aya-tool`): {}",
                aya_tool, e
            )
        });

    if !output.status.success() {
        panic!(
            "{} generate failed: {}",
            aya_tool,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    let bindings = out_dir.join("vmlinux.rs");
    fs::write(&bindings, &output.stdout).expect("failed to write vmlinux.rs");
}
