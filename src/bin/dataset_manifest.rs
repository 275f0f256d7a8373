use otu_dashboard::data::{analyze_dataset, default_manifest_path};
use otu_dashboard::logging::ts_epoch_secs;
use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    let path = PathBuf::from(
        env::args()
            .nth(1)
            .unwrap_or_else(|| "data/samples.json".to_string()),
    );

    let manifest = match analyze_dataset(&path, ts_epoch_secs()) {
        Ok(m) => m,
        Err(err) => {
            eprintln!("analysis failed: {:#}", err);
            std::process::exit(1);
        }
    };

    let body = match serde_json::to_string_pretty(&manifest) {
        Ok(b) => b,
        Err(err) => {
            eprintln!("manifest encode failed: {}", err);
            std::process::exit(2);
        }
    };
    println!("{}", body);

    let out_path = default_manifest_path(&path);
    if let Err(err) = fs::write(&out_path, &body) {
        eprintln!("failed to write {}: {}", out_path.display(), err);
        std::process::exit(3);
    }
    eprintln!("wrote manifest {}", out_path.display());
}
