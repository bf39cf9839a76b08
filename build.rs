use std::process::Command;

/// Short revision of the checked-out commit, if this is a git checkout.
fn git_rev() -> Option<String> {
    let out = Command::new("git")
        .args(["rev-parse", "--short=12", "HEAD"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let rev = String::from_utf8(out.stdout).ok()?;
    let rev = rev.trim();
    (!rev.is_empty()).then(|| rev.to_string())
}

fn main() {
    println!(
        "cargo:rustc-env=BUILD_GIT_REV={}",
        git_rev().as_deref().unwrap_or("unknown")
    );
    // re-run when the checked-out commit moves
    println!("cargo:rerun-if-changed=.git/HEAD");
}
