// build.rs

fn main() {
    // Build timestamp and git commit for /api/version
    vergen::EmitBuilder::builder()
        .build_timestamp()
        .git_sha(true)
        .emit()
        .expect("Unable to generate build info");
}
