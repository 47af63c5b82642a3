use std::path::Path;
use std::process::Command;

const INPUT: &str = "assets/css/input.css";
const OUTPUT: &str = "assets/css/output.css";
const FALLBACK: &str = "assets/css/fallback.css";

fn main() {
    for path in [INPUT, FALLBACK, "tailwind.config.js", "templates/"] {
        println!("cargo:rerun-if-changed={path}");
    }

    let compiled = Command::new("tailwindcss")
        .args(["-c", "tailwind.config.js", "-i", INPUT, "-o", OUTPUT, "--minify"])
        .status();

    let reason = match compiled {
        Ok(status) if status.success() => return,
        Ok(status) => format!("tailwindcss exited with {status}"),
        Err(e) => format!("tailwindcss not runnable ({e})"),
    };

    // output.css is embedded into the binary, so it has to exist either way
    println!("cargo:warning={reason}, using {FALLBACK}");
    if let Some(dir) = Path::new(OUTPUT).parent() {
        std::fs::create_dir_all(dir).ok();
    }
    if let Err(e) = std::fs::copy(FALLBACK, OUTPUT) {
        println!("cargo:warning=could not write {OUTPUT}: {e}");
    }
}
