//! Single-object operations behind authentication.

#[cfg(test)]
mod tests {
    use holydb_storage::ObjectStore;
    use http::{Method, StatusCode};

    use crate::{TestEnv, body_text};

    #[tokio::test]
    async fn test_should_put_and_get_object() {
        let env = TestEnv::new();

        let resp = env
            .handle(env.signed(Method::PUT, "/photos/2024/cat.jpg", "meow"))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = env
            .handle(env.signed(Method::GET, "/photos/2024/cat.jpg", ""))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(&resp), "meow");

        let stored = env.store.root().join("photos/2024/cat.jpg/part.1");
        assert_eq!(std::fs::read(stored).unwrap(), b"meow");
    }

    #[tokio::test]
    async fn test_should_store_buffered_body_verbatim() {
        let env = TestEnv::new();
        let payload = vec![0xA5_u8; 64 * 1024];

        let resp = env
            .handle(env.signed_unhashed(Method::PUT, "/blobs/large.bin", payload.clone()))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = env
            .handle(env.signed(Method::GET, "/blobs/large.bin", ""))
            .await;
        assert_eq!(resp.body().as_ref(), payload.as_slice());
    }

    #[tokio::test]
    async fn test_should_decode_percent_encoded_keys() {
        let env = TestEnv::new();
        let resp = env
            .handle(env.signed(Method::PUT, "/docs/my%20notes.txt", "x"))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);

        assert_eq!(
            env.store.list("docs", "").await.unwrap(),
            vec!["my notes.txt".to_owned()]
        );
    }

    #[tokio::test]
    async fn test_should_return_not_found_for_missing_object() {
        let env = TestEnv::new();
        let resp = env
            .handle(env.signed(Method::GET, "/photos/ghost.jpg", ""))
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(body_text(&resp).starts_with("not_found: "));
    }

    #[tokio::test]
    async fn test_should_reject_traversal_keys() {
        let env = TestEnv::new();
        let resp = env
            .handle(env.signed(Method::PUT, "/photos/../escape", "x"))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(!env.store.root().join("escape").exists());
    }

    #[tokio::test]
    async fn test_should_delete_idempotently() {
        let env = TestEnv::new();
        env.handle(env.signed(Method::PUT, "/photos/cat.jpg", "meow"))
            .await;

        for _ in 0..2 {
            let resp = env
                .handle(env.signed(Method::DELETE, "/photos/cat.jpg", ""))
                .await;
            assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        }

        let resp = env
            .handle(env.signed(Method::GET, "/photos/cat.jpg", ""))
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_should_list_with_raw_prefix() {
        let env = TestEnv::new();
        for key in ["b/1", "abc/x", "ab/2", "ab/1"] {
            let resp = env
                .handle(env.signed(Method::PUT, &format!("/bucket/{key}"), key))
                .await;
            assert_eq!(resp.status(), StatusCode::OK, "{key}");
        }

        let resp = env
            .handle(env.signed(Method::GET, "/bucket?prefix=ab", ""))
            .await;
        assert_eq!(body_text(&resp), "ab/1\nab/2\nabc/x");

        let resp = env
            .handle(env.signed(Method::GET, "/bucket?prefix=ab%2F", ""))
            .await;
        assert_eq!(body_text(&resp), "ab/1\nab/2");
    }
}
