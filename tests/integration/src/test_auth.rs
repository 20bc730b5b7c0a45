//! Admission tests: what reaches storage and what does not.

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use chrono::{TimeDelta, Utc};
    use holydb_auth::{AuthConfig, RequestSigner};
    use holydb_storage::ObjectStore;
    use http::{Method, StatusCode};
    use http_body_util::Full;

    use crate::{ACCESS_KEY, IDENTITY_HEADER, TestEnv, body_text};

    #[tokio::test]
    async fn test_should_reject_unsigned_put_without_touching_storage() {
        let env = TestEnv::new();
        let resp = env
            .handle(env.unsigned(Method::PUT, "/photos/cat.jpg", "meow"))
            .await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_text(&resp), "unauthorized: missing credentials");
        assert!(!env.store.root().join("photos").exists());
    }

    #[tokio::test]
    async fn test_should_reject_body_swapped_after_signing() {
        let env = TestEnv::new();
        let mut req = env.signed_unhashed(Method::PUT, "/photos/cat.jpg", "meow");
        *req.body_mut() = Full::new(Bytes::from_static(b"woof"));

        let resp = env.handle(req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert!(body_text(&resp).contains("signature mismatch"));
        assert!(env.store.list("photos", "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_should_reject_wrong_secret() {
        let env = TestEnv::new();
        let mut req = env.unsigned(Method::PUT, "/photos/cat.jpg", "meow");
        RequestSigner::for_config(ACCESS_KEY, "not-the-secret", env.validator.config())
            .sign(&mut req, b"meow", Utc::now())
            .unwrap();

        let resp = env.handle(req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert!(!env.store.root().join("photos").exists());
    }

    #[tokio::test]
    async fn test_should_reject_stale_request() {
        let env = TestEnv::new();
        let mut req = env.unsigned(Method::GET, "/photos?prefix=", "");
        env.signer
            .sign(&mut req, b"", Utc::now() - TimeDelta::minutes(10))
            .unwrap();

        let resp = env.handle(req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert!(body_text(&resp).contains("request expired"));
    }

    #[tokio::test]
    async fn test_should_propagate_identity_of_signed_request() {
        let env = TestEnv::new();
        let resp = env
            .handle(env.signed(Method::PUT, "/photos/cat.jpg", "meow"))
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[IDENTITY_HEADER], ACCESS_KEY);
    }

    #[tokio::test]
    async fn test_should_admit_anonymous_requests_when_auth_optional() {
        let env = TestEnv::with_auth_config(AuthConfig::builder().require_auth(false).build());

        let resp = env
            .handle(env.unsigned(Method::PUT, "/public/readme.txt", "hello"))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(!resp.headers().contains_key(IDENTITY_HEADER));

        let resp = env
            .handle(env.unsigned(Method::GET, "/public/readme.txt", ""))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(&resp), "hello");
    }

    #[tokio::test]
    async fn test_should_verify_signed_requests_even_when_auth_optional() {
        let env = TestEnv::with_auth_config(AuthConfig::builder().require_auth(false).build());
        let mut req = env.unsigned(Method::PUT, "/public/readme.txt", "hello");
        RequestSigner::for_config("stranger", "secret", env.validator.config())
            .sign(&mut req, b"hello", Utc::now())
            .unwrap();

        let resp = env.handle(req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert!(body_text(&resp).contains("unknown access key: stranger"));
        assert!(!env.store.root().join("public").exists());
    }
}
