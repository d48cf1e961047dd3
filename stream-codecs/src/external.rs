//! Codec transforms delegated to an external executable.

use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

/// Run `program args..` with `reader` on its stdin and its stdout copied into `writer`.
///
/// The child is killed if either side of the copy fails, so a dead downstream
/// never leaves the feeder blocked on a full pipe.
pub(crate) fn pipe_through<R, W>(program: &Path, args: &[String], mut reader: R, mut writer: W) -> io::Result<()>
where
    R: Read + Send,
    W: Write,
{
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| io::Error::other("child stdin was not captured"))?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("child stdout was not captured"))?;

    let copied = thread::scope(|scope| {
        let feeder = scope.spawn(move || -> io::Result<u64> {
            let fed = io::copy(&mut reader, &mut stdin);
            // Closing stdin is the child's end-of-input.
            drop(stdin);
            fed
        });

        let drained = io::copy(&mut stdout, &mut writer);
        if drained.is_err() {
            let _ = child.kill();
        }

        let fed = feeder
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("external codec feeder panicked")));
        if fed.is_err() {
            let _ = child.kill();
        }
        fed.and(drained)
    });

    let status = child.wait()?;
    copied?;

    if !status.success() {
        return Err(io::Error::other(format!("{} exited with {}", program.display(), status)));
    }

    writer.flush()
}
