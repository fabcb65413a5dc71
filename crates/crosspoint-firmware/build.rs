use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=sdkconfig.defaults");

    if env::var("ESP_IDF_SDKCONFIG_DEFAULTS").is_err() {
        println!(
            "cargo:warning=ESP_IDF_SDKCONFIG_DEFAULTS not set; build with \
             ESP_IDF_SDKCONFIG_DEFAULTS=crates/crosspoint-firmware/sdkconfig.defaults"
        );
    }

    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        let manifest_dir = PathBuf::from(manifest_dir);
        invalidate_stale_sdkconfig(&manifest_dir.join("sdkconfig.defaults"), &manifest_dir.join("target"));
    }

    embuild::espidf::sysenv::output();
}

/// esp-idf-sys caches the generated sdkconfig; drop it when the defaults are newer
/// so stack sizes and FATFS options take effect.
fn invalidate_stale_sdkconfig(defaults: &Path, target_dir: &Path) {
    let Some(defaults_time) = modified(defaults) else {
        return;
    };
    let Ok(profiles) = fs::read_dir(target_dir) else {
        return;
    };

    for profile in profiles.flatten() {
        let Ok(builds) = fs::read_dir(profile.path().join("build")) else {
            continue;
        };
        for build in builds.flatten() {
            let build_path = build.path();
            if !build_path.to_string_lossy().contains("esp-idf-sys") {
                continue;
            }
            let idf_out = build_path.join("out/esp-idf");
            let sdkconfig = idf_out.join("sdkconfig");
            if modified(&sdkconfig).is_some_and(|generated| defaults_time > generated) {
                println!("cargo:warning=sdkconfig.defaults changed, regenerating sdkconfig");
                let _ = fs::remove_file(&sdkconfig);
                let _ = fs::remove_dir_all(idf_out.join("sdkconfig.d"));
            }
        }
    }
}

fn modified(path: &Path) -> Option<std::time::SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}
