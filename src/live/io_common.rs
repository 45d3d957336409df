use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// A seeded generator makes codes, shuffles and tiebreaks reproducible.
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// A path in a temporary directory private to this test process.
#[cfg(test)]
pub(crate) fn test_path(name: &str) -> String {
    let dir = std::env::temp_dir().join(format!("livevote-tests-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(name).display().to_string()
}
