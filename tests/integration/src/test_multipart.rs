//! Multipart upload and reconstruction behind authentication.

#[cfg(test)]
mod tests {
    use holydb_storage::artifact::decode_artifact;
    use holydb_storage::{FILENAME_KEY, Metadata, ObjectStore};
    use http::{Method, StatusCode};

    use crate::{TestEnv, body_text};

    async fn start_upload(env: &TestEnv, path: &str) -> String {
        let resp = env
            .handle(env.signed(Method::POST, &format!("{path}?uploads"), ""))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        body_text(&resp).to_owned()
    }

    async fn upload_part(env: &TestEnv, path: &str, upload_id: &str, n: u32, data: &'static str) {
        let uri = format!("{path}?uploadId={upload_id}&partNumber={n}");
        let resp = env.handle(env.signed_unhashed(Method::PUT, &uri, data)).await;
        assert_eq!(resp.status(), StatusCode::OK, "part {n}");
    }

    #[tokio::test]
    async fn test_should_assemble_parts_in_numeric_order() {
        let env = TestEnv::new();
        let upload_id = start_upload(&env, "/videos/clip.mp4").await;

        upload_part(&env, "/videos/clip.mp4", &upload_id, 2, "BBBB").await;
        upload_part(&env, "/videos/clip.mp4", &upload_id, 1, "AAAA").await;

        let resp = env
            .handle(env.signed(
                Method::POST,
                &format!("/videos/clip.mp4?uploadId={upload_id}"),
                "",
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = env
            .handle(env.signed(Method::GET, "/videos/clip.mp4", ""))
            .await;
        assert_eq!(body_text(&resp), "AAAABBBB");

        let stats = env.store.stats("videos").await.unwrap();
        assert_eq!(stats.object_count, 1);
        assert_eq!(stats.used_bytes, 8);
    }

    #[tokio::test]
    async fn test_should_abort_idempotently() {
        let env = TestEnv::new();
        let upload_id = start_upload(&env, "/videos/clip.mp4").await;
        upload_part(&env, "/videos/clip.mp4", &upload_id, 1, "AAAA").await;

        let path = format!("/videos/clip.mp4?uploadId={upload_id}");
        for _ in 0..2 {
            let resp = env.handle(env.signed(Method::DELETE, &path, "")).await;
            assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        }

        let resp = env.handle(env.signed(Method::POST, &path, "")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(env.store.list("videos", "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_should_refuse_to_complete_empty_upload() {
        let env = TestEnv::new();
        let upload_id = start_upload(&env, "/videos/clip.mp4").await;

        let resp = env
            .handle(env.signed(
                Method::POST,
                &format!("/videos/clip.mp4?uploadId={upload_id}"),
                "",
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_should_reconstruct_uploaded_object() {
        let env = TestEnv::new();
        let upload_id = start_upload(&env, "/videos/clip.mp4").await;
        upload_part(&env, "/videos/clip.mp4", &upload_id, 1, "AAAA").await;
        upload_part(&env, "/videos/clip.mp4", &upload_id, 2, "BBBB").await;
        env.store
            .complete_multipart("videos", "clip.mp4", &upload_id, &Metadata::new())
            .await
            .unwrap();

        let metadata = Metadata::from([
            (FILENAME_KEY.to_owned(), "clip.mp4".to_owned()),
            ("codec".to_owned(), "h264".to_owned()),
            ("owner".to_owned(), "alice".to_owned()),
        ]);
        env.store
            .put_metadata("videos", "clip.mp4", &metadata)
            .await
            .unwrap();

        let output = env.scratch().join("export/clip.artifact");
        env.store
            .reconstruct("videos", "clip.mp4", &output, &["codec"])
            .await
            .unwrap();

        let bytes = std::fs::read(&output).unwrap();
        let (header, payload) = decode_artifact(&bytes).unwrap();
        assert_eq!(
            header,
            Metadata::from([
                (FILENAME_KEY.to_owned(), "clip.mp4".to_owned()),
                ("codec".to_owned(), "h264".to_owned()),
            ])
        );
        assert_eq!(payload, b"AAAABBBB");
    }
}
