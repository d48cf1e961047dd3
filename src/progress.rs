//! Spinner text for a running compression.

use std::path::Path;

use lambdafs_core::Throughput;

pub fn status(input: &Path, output: &Path, throughput: &Throughput, done: bool) -> String {
    let output_name = output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (verb, tail) = if done { ("Compressed", ".") } else { ("Compressing", "...") };
    format!(
        "{verb} '{}' ({:.2} MiB) to '{output_name}' ({:.2} MiB){tail}",
        input.display(),
        throughput.read_mib(),
        throughput.written_mib(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_lines() {
        let throughput = Throughput {
            read: 3 * 1024 * 1024,
            written: 512 * 1024,
        };
        let input = Path::new("/data/photos");
        let output = Path::new("/data/photos.tar.br");

        assert_eq!(
            status(input, output, &throughput, false),
            "Compressing '/data/photos' (3.00 MiB) to 'photos.tar.br' (0.50 MiB)..."
        );
        assert_eq!(
            status(input, output, &throughput, true),
            "Compressed '/data/photos' (3.00 MiB) to 'photos.tar.br' (0.50 MiB)."
        );
    }
}
