use std::io::{Read as _, Write as _};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::JoinHandle;

use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::foundation::math::mul_div255_u16;

/// Whether a runnable `ffmpeg` binary is on `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// A system `ffmpeg` child fed on stdin whose stdout is drained on a reader thread.
///
/// The child is killed if the process is dropped before [`FfmpegProcess::finish`].
pub(crate) struct FfmpegProcess {
    label: &'static str,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout_rx: Receiver<std::io::Result<Vec<u8>>>,
    stdout_thread: Option<JoinHandle<()>>,
    stderr_thread: Option<JoinHandle<Vec<u8>>>,
    finished: bool,
}

impl FfmpegProcess {
    pub(crate) fn spawn(label: &'static str, args: &[String]) -> SlidecastResult<Self> {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-hide_banner", "-loglevel", "error"])
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        tracing::debug!(encoder = label, ?args, "spawning ffmpeg");

        let mut child = cmd.spawn().map_err(|e| {
            SlidecastError::encode(format!(
                "failed to spawn ffmpeg for {label} (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (Some(stdin), Some(mut stdout), Some(mut stderr)) = (stdin, stdout, stderr) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(SlidecastError::encode(format!(
                "failed to open ffmpeg pipes for {label}"
            )));
        };

        let (tx, stdout_rx) = mpsc::channel();
        let stdout_thread = std::thread::spawn(move || {
            let mut buf = vec![0u8; 64 * 1024];
            loop {
                match stdout.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(Ok(buf[..n].to_vec())).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                    Err(e) => {
                        let _ = tx.send(Err(e));
                        break;
                    }
                }
            }
        });
        let stderr_thread = std::thread::spawn(move || {
            let mut out = Vec::new();
            let _ = stderr.read_to_end(&mut out);
            out
        });

        Ok(Self {
            label,
            child,
            stdin: Some(stdin),
            stdout_rx,
            stdout_thread: Some(stdout_thread),
            stderr_thread: Some(stderr_thread),
            finished: false,
        })
    }

    pub(crate) fn write(&mut self, bytes: &[u8]) -> SlidecastResult<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(SlidecastError::encode(format!(
                "{} encoder is already finished",
                self.label
            )));
        };
        stdin.write_all(bytes).map_err(|e| {
            SlidecastError::encode(format!("failed to write to ffmpeg ({}): {e}", self.label))
        })
    }

    /// Output produced so far, without blocking.
    pub(crate) fn read_available(&mut self) -> SlidecastResult<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            match self.stdout_rx.try_recv() {
                Ok(chunk) => out.extend_from_slice(&self.check_chunk(chunk)?),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return Ok(out),
            }
        }
    }

    /// Close stdin, collect the remaining output and check the exit status.
    pub(crate) fn finish(&mut self) -> SlidecastResult<Vec<u8>> {
        drop(self.stdin.take());
        let mut out = Vec::new();
        while let Ok(chunk) = self.stdout_rx.recv() {
            out.extend_from_slice(&self.check_chunk(chunk)?);
        }
        if let Some(handle) = self.stdout_thread.take() {
            let _ = handle.join();
        }

        let status = self.child.wait().map_err(|e| {
            SlidecastError::encode(format!("failed to wait for ffmpeg ({}): {e}", self.label))
        })?;
        self.finished = true;
        let stderr = self
            .stderr_thread
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(SlidecastError::encode(format!(
                "ffmpeg ({}) exited with status {status}: {}",
                self.label,
                stderr.trim()
            )));
        }
        tracing::debug!(encoder = self.label, bytes = out.len(), "ffmpeg finished");
        Ok(out)
    }

    fn check_chunk(&self, chunk: std::io::Result<Vec<u8>>) -> SlidecastResult<Vec<u8>> {
        chunk.map_err(|e| {
            SlidecastError::encode(format!("failed to read ffmpeg output ({}): {e}", self.label))
        })
    }
}

impl Drop for FfmpegProcess {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        drop(self.stdin.take());
        let _ = self.child.kill();
        let _ = self.child.wait();
        tracing::debug!(encoder = self.label, "killed unfinished ffmpeg");
    }
}

/// Flatten RGBA8 (premultiplied or straight) onto an opaque background color.
pub(crate) fn flatten_to_opaque_rgba8(
    dst: &mut [u8],
    src: &[u8],
    src_is_premul: bool,
    bg_rgba: [u8; 4],
) -> SlidecastResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(SlidecastError::validation(
            "flatten_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg = [
        u16::from(bg_rgba[0]),
        u16::from(bg_rgba[1]),
        u16::from(bg_rgba[2]),
    ];
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255 - a;
        for c in 0..3 {
            let fg = if src_is_premul {
                u16::from(s[c])
            } else {
                mul_div255_u16(u16::from(s[c]), a)
            };
            d[c] = (fg + mul_div255_u16(bg[c], inv)).min(255) as u8;
        }
        d[3] = 255;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
