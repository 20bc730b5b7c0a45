//! Request body handed downstream after authentication.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use http_body_util::Full;
use pin_project_lite::pin_project;

pin_project! {
    #[derive(Debug)]
    #[project = KindProj]
    enum Kind<B> {
        Original { #[pin] body: B },
        Buffered { body: Full<Bytes> },
    }
}

pin_project! {
    /// The body of an authenticated request.
    ///
    /// Either the caller's untouched body, when the payload hash came from the
    /// `X-Amz-Content-Sha256` header, or the bytes the validator buffered to
    /// hash the payload itself. Both yield exactly the bytes the client sent.
    #[derive(Debug)]
    pub struct ReplayBody<B> {
        #[pin]
        kind: Kind<B>,
    }
}

impl<B> ReplayBody<B> {
    /// Pass the original body through unread.
    pub fn original(body: B) -> Self {
        Self {
            kind: Kind::Original { body },
        }
    }

    /// Replay already-buffered bytes.
    pub fn buffered(bytes: impl Into<Bytes>) -> Self {
        Self {
            kind: Kind::Buffered {
                body: Full::new(bytes.into()),
            },
        }
    }

    /// Whether the validator consumed and buffered the original body.
    #[must_use]
    pub fn is_buffered(&self) -> bool {
        matches!(self.kind, Kind::Buffered { .. })
    }
}

impl<B> Body for ReplayBody<B>
where
    B: Body<Data = Bytes>,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project().kind.project() {
            KindProj::Original { body } => body.poll_frame(cx),
            KindProj::Buffered { body } => Pin::new(body)
                .poll_frame(cx)
                .map_err(|never| match never {}),
        }
    }

    fn is_end_stream(&self) -> bool {
        match &self.kind {
            Kind::Original { body } => body.is_end_stream(),
            Kind::Buffered { body } => body.is_end_stream(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.kind {
            Kind::Original { body } => body.size_hint(),
            Kind::Buffered { body } => body.size_hint(),
        }
    }
}
