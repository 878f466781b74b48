//! Random output file names.

use rand::distr::Alphanumeric;
use rand::Rng;

/// Length of the random part of a file name.
pub const NAME_LEN: usize = 8;

/// Returns `<8 alphanumerics>.<ext>`. Draws from the thread-local CSPRNG; no
/// collision check is made.
pub fn random_file_name(ext: &str) -> String {
    let mut rng = rand::rng();
    let stem: String = std::iter::repeat_with(|| rng.sample(Alphanumeric) as char)
        .take(NAME_LEN)
        .collect();
    format!("{}.{}", stem, ext.trim_start_matches('.'))
}
