//! Lazy concatenation of part files.

use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};

type OpenFuture = Pin<Box<dyn Future<Output = io::Result<File>> + Send>>;

enum State {
    Idle,
    Opening(OpenFuture),
    Reading(File),
    Done,
}

/// Reads a sequence of part files back to back.
///
/// Files are opened one at a time, only once the previous one is exhausted, so
/// at most one handle is held. The current handle is dropped at its EOF, on any
/// error, and when the reader is dropped. After an error the reader stays
/// finished and yields EOF.
pub(crate) struct PartReader {
    remaining: VecDeque<PathBuf>,
    state: State,
}

impl PartReader {
    pub(crate) fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            remaining: paths.into_iter().collect(),
            state: State::Idle,
        }
    }

    fn fail(&mut self) {
        self.remaining.clear();
        self.state = State::Done;
    }
}

impl std::fmt::Debug for PartReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            State::Idle => "idle",
            State::Opening(_) => "opening",
            State::Reading(_) => "reading",
            State::Done => "done",
        };
        f.debug_struct("PartReader")
            .field("remaining", &self.remaining.len())
            .field("state", &state)
            .finish()
    }
}

fn open_part(path: PathBuf) -> OpenFuture {
    Box::pin(async move {
        File::open(&path)
            .await
            .map_err(|e| io::Error::new(e.kind(), format!("failed to open {}: {e}", path.display())))
    })
}

impl AsyncRead for PartReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        loop {
            match &mut this.state {
                State::Idle => {
                    this.state = match this.remaining.pop_front() {
                        Some(path) => State::Opening(open_part(path)),
                        None => State::Done,
                    };
                }
                State::Opening(open) => match ready!(open.as_mut().poll(cx)) {
                    Ok(file) => this.state = State::Reading(file),
                    Err(e) => {
                        this.fail();
                        return Poll::Ready(Err(e));
                    }
                },
                State::Reading(file) => {
                    let filled = buf.filled().len();
                    match ready!(Pin::new(file).poll_read(cx, buf)) {
                        Ok(()) if buf.filled().len() == filled => this.state = State::Idle,
                        Ok(()) => return Poll::Ready(Ok(())),
                        Err(e) => {
                            this.fail();
                            return Poll::Ready(Err(e));
                        }
                    }
                }
                State::Done => return Poll::Ready(Ok(())),
            }
        }
    }
}
