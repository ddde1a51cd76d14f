use picshelf_server::entity::picture;
use sea_orm::EntityTrait;
use serde_json::json;

use crate::common::{Session, TestApp, png_bytes, routes};

async fn approve(admin: &Session, id: i64) {
    let res = admin
        .post(
            routes::PICTURE_REVIEW,
            &json!({"id": id, "reviewStatus": 1, "reviewMessage": "ok"}),
        )
        .await;
    assert_eq!(res.status, 200, "Review failed: {}", res.text);
}

mod file_upload {
    use super::*;

    #[tokio::test]
    async fn upload_requires_login() {
        let app = TestApp::spawn().await;
        let res = app
            .anonymous()
            .upload_file("a.png", png_bytes(4, 4), None, None)
            .await;
        assert_eq!(res.status, 401);
        assert_eq!(res.code(), 40100);
    }

    #[tokio::test]
    async fn user_upload_waits_for_review() {
        let app = TestApp::spawn().await;
        let (alice, alice_id) = app.register_and_login("alice", "pw1").await;
        let admin = app.admin().await;

        let id = alice.upload_png("sunset.png").await;

        let res = admin.get(&routes::picture_get_full(id)).await;
        assert_eq!(res.status, 200, "Response: {}", res.text);
        let picture = &res.body["picture"];
        assert_eq!(picture["reviewStatus"], 0);
        assert_eq!(picture["userId"], alice_id);
        assert_eq!(picture["name"], "sunset");
        assert_eq!(picture["picWidth"], 40);
        assert_eq!(picture["picHeight"], 20);
        assert_eq!(picture["picScale"], 2.0);
        assert_eq!(picture["picFormat"], "png");
        let url = picture["url"].as_str().unwrap();
        assert!(url.starts_with(&format!("/assets/public/{alice_id}/")), "{url}");
        assert!(url.ends_with(&format!("_{id}.png")), "{url}");

        let res = alice.get(routes::PICTURE_SEARCH).await;
        assert_eq!(res.body["total"], 0);
    }

    #[tokio::test]
    async fn approved_upload_is_listed_with_owner() {
        let app = TestApp::spawn().await;
        let (alice, alice_id) = app.register_and_login("alice", "pw1").await;
        let admin = app.admin().await;
        let id = alice.upload_png("sunset.png").await;
        approve(&admin, id).await;

        let res = app.anonymous().get(routes::PICTURE_SEARCH).await;
        assert_eq!(res.status, 200, "Response: {}", res.text);
        assert_eq!(res.body["total"], 1);
        let picture = &res.body["pictures"][0];
        assert_eq!(picture["id"], id);
        assert_eq!(picture["user"]["id"], alice_id);
        assert!(picture.get("reviewStatus").is_none());
    }

    #[tokio::test]
    async fn stored_asset_is_served() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.register_and_login("alice", "pw1").await;
        let id = alice.upload_png("sunset.png").await;

        let res = app.anonymous().get(&routes::picture_get(id)).await;
        let url = res.body["picture"]["url"].as_str().unwrap().to_string();
        let asset = app.anonymous().get(&url).await;
        assert_eq!(asset.status, 200);
    }

    #[tokio::test]
    async fn name_field_overrides_file_name() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.register_and_login("alice", "pw1").await;
        let res = alice
            .upload_file("a.png", png_bytes(4, 4), None, Some("Harbour"))
            .await;
        let res = app.anonymous().get(&routes::picture_get(res.id())).await;
        assert_eq!(res.body["picture"]["name"], "Harbour");
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.register_and_login("alice", "pw1").await;
        let res = alice
            .upload_file("anim.gif", vec![1, 2, 3], None, None)
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.code(), 40000);
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.register_and_login("alice", "pw1").await;
        let res = alice
            .upload_file("huge.png", vec![0u8; 2 * 1024 * 1024 + 1], None, None)
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.code(), 40000);
    }

    #[tokio::test]
    async fn missing_file_part_is_rejected() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.register_and_login("alice", "pw1").await;
        let res = alice.post(routes::PICTURE_UPLOAD, &json!({})).await;
        assert_eq!(res.code(), 40000);
    }

    #[tokio::test]
    async fn undecodable_image_fails_the_operation() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.register_and_login("alice", "pw1").await;
        let res = alice
            .upload_file("fake.png", b"definitely not a png".to_vec(), None, None)
            .await;
        assert_eq!(res.status, 500);
        assert_eq!(res.code(), 50001);
    }
}

mod url_upload {
    use super::*;

    #[tokio::test]
    async fn url_upload_records_dimensions() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.register_and_login("alice", "pw1").await;
        let admin = app.admin().await;

        let res = alice
            .post(
                routes::PICTURE_UPLOAD_URL,
                &json!({"fileUrl": app.fixture_url("/img/wide.png")}),
            )
            .await;
        assert_eq!(res.status, 200, "Response: {}", res.text);

        let res = admin.get(&routes::picture_get_full(res.id())).await;
        let picture = &res.body["picture"];
        assert_eq!(picture["name"], "wide");
        assert_eq!(picture["picWidth"], 200);
        assert_eq!(picture["picHeight"], 100);
        assert_eq!(picture["picScale"], 2.0);
    }

    #[tokio::test]
    async fn json_body_on_the_upload_route_is_accepted() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.register_and_login("alice", "pw1").await;
        let res = alice
            .post(
                routes::PICTURE_UPLOAD,
                &json!({"fileUrl": app.fixture_url("/img/tall.png")}),
            )
            .await;
        assert_eq!(res.status, 200, "Response: {}", res.text);
    }

    #[tokio::test]
    async fn extension_falls_back_to_content_type() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.register_and_login("alice", "pw1").await;
        let res = alice
            .post(
                routes::PICTURE_UPLOAD_URL,
                &json!({"fileUrl": app.fixture_url("/img/download")}),
            )
            .await;
        assert_eq!(res.status, 200, "Response: {}", res.text);

        let res = app.anonymous().get(&routes::picture_get(res.id())).await;
        assert!(res.body["picture"]["url"].as_str().unwrap().ends_with(".png"));
    }

    #[tokio::test]
    async fn rejects_bad_urls() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.register_and_login("alice", "pw1").await;

        for url in [
            String::new(),
            "not a url".to_string(),
            "ftp://example.com/a.png".to_string(),
            app.fixture_url("/img/missing.png"),
            app.fixture_url("/img/note.png"),
            app.fixture_url("/img/anim.gif"),
            app.fixture_url("/img/big.png"),
        ] {
            let res = alice
                .post(routes::PICTURE_UPLOAD_URL, &json!({"fileUrl": url}))
                .await;
            assert_eq!(res.status, 400, "{url}: {}", res.text);
            assert_eq!(res.code(), 40000);
        }
    }

    #[tokio::test]
    async fn unreachable_host_fails_the_operation() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.register_and_login("alice", "pw1").await;
        let res = alice
            .post(
                routes::PICTURE_UPLOAD_URL,
                &json!({"fileUrl": "http://127.0.0.1:1/a.png"}),
            )
            .await;
        assert_eq!(res.status, 500);
        assert_eq!(res.code(), 50001);
    }
}

mod reupload {
    use super::*;

    #[tokio::test]
    async fn owner_reupload_keeps_id_and_returns_to_review() {
        let app = TestApp::spawn().await;
        let (alice, alice_id) = app.register_and_login("alice", "pw1").await;
        let admin = app.admin().await;
        let id = alice.upload_png("first.png").await;
        approve(&admin, id).await;

        let res = alice
            .upload_file("second.png", png_bytes(10, 10), Some(id), None)
            .await;
        assert_eq!(res.status, 200, "Response: {}", res.text);
        assert_eq!(res.id(), id);

        let res = admin.get(&routes::picture_get_full(id)).await;
        let picture = &res.body["picture"];
        assert_eq!(picture["userId"], alice_id);
        assert_eq!(picture["picWidth"], 10);
        assert_eq!(picture["reviewStatus"], 0);
    }

    #[tokio::test]
    async fn stranger_cannot_reupload() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.register_and_login("alice", "pw1").await;
        let (bob, _) = app.register_and_login("bob", "pw1").await;
        let id = alice.upload_png("mine.png").await;

        let res = bob
            .upload_file("theirs.png", png_bytes(4, 4), Some(id), None)
            .await;
        assert_eq!(res.status, 403);
        assert_eq!(res.code(), 40101);
    }

    #[tokio::test]
    async fn admin_reupload_keeps_owner_and_approves() {
        let app = TestApp::spawn().await;
        let (alice, alice_id) = app.register_and_login("alice", "pw1").await;
        let admin = app.admin().await;
        let id = alice.upload_png("mine.png").await;

        let res = admin
            .upload_file("fixed.png", png_bytes(6, 3), Some(id), None)
            .await;
        assert_eq!(res.status, 200, "Response: {}", res.text);

        let res = admin.get(&routes::picture_get_full(id)).await;
        let picture = &res.body["picture"];
        assert_eq!(picture["userId"], alice_id);
        assert_eq!(picture["reviewStatus"], 1);
        assert_eq!(picture["reviewMessage"], "auto-approved by admin");
    }

    #[tokio::test]
    async fn reupload_of_unknown_picture_is_not_found() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.register_and_login("alice", "pw1").await;
        let res = alice
            .upload_file("a.png", png_bytes(4, 4), Some(12345), None)
            .await;
        assert_eq!(res.status, 404);
    }
}

mod editing {
    use super::*;

    #[tokio::test]
    async fn self_edit_is_owner_only() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.register_and_login("alice", "pw1").await;
        let (bob, _) = app.register_and_login("bob", "pw1").await;
        let id = alice.upload_png("mine.png").await;

        let res = bob
            .post(routes::PICTURE_SELF_EDIT, &json!({"id": id, "name": "stolen"}))
            .await;
        assert_eq!(res.status, 403);
        assert_eq!(res.code(), 40101);
    }

    #[tokio::test]
    async fn self_edit_sends_approved_picture_back_to_review() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.register_and_login("alice", "pw1").await;
        let admin = app.admin().await;
        let id = alice.upload_png("mine.png").await;
        approve(&admin, id).await;

        let res = alice
            .post(
                routes::PICTURE_SELF_EDIT,
                &json!({"id": id, "introduction": "at dusk", "category": "poster"}),
            )
            .await;
        assert_eq!(res.status, 200, "Response: {}", res.text);

        let res = admin.get(&routes::picture_get_full(id)).await;
        let picture = &res.body["picture"];
        assert_eq!(picture["reviewStatus"], 0);
        assert_eq!(picture["introduction"], "at dusk");
        assert_eq!(picture["category"], "poster");
        assert!(picture["reviewerId"].is_null());
    }

    #[tokio::test]
    async fn admin_update_is_auto_approved() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.register_and_login("alice", "pw1").await;
        let admin = app.admin().await;
        let admin_id = admin.get(routes::SESSION).await.body["user"]["id"].clone();
        let id = alice.upload_png("mine.png").await;

        let res = admin
            .post(routes::PICTURE_UPDATE, &json!({"id": id, "name": "curated"}))
            .await;
        assert_eq!(res.status, 200, "Response: {}", res.text);

        let res = admin.get(&routes::picture_get_full(id)).await;
        let picture = &res.body["picture"];
        assert_eq!(picture["name"], "curated");
        assert_eq!(picture["reviewStatus"], 1);
        assert_eq!(picture["reviewerId"], admin_id);
    }

    #[tokio::test]
    async fn admin_update_is_admin_only() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.register_and_login("alice", "pw1").await;
        let id = alice.upload_png("mine.png").await;

        let res = alice
            .post(routes::PICTURE_UPDATE, &json!({"id": id, "name": "mine"}))
            .await;
        assert_eq!(res.code(), 40101);
    }

    #[tokio::test]
    async fn edit_without_changes_is_rejected() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.register_and_login("alice", "pw1").await;
        let id = alice.upload_png("mine.png").await;
        let res = alice.post(routes::PICTURE_SELF_EDIT, &json!({"id": id})).await;
        assert_eq!(res.code(), 40000);
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn tag_filter_requires_every_tag_and_keeps_order() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let tagged = admin.upload_png("tagged.png").await;
        let other = admin.upload_png("other.png").await;
        admin
            .post(
                routes::PICTURE_UPDATE,
                &json!({"id": tagged, "tags": ["zeta", "alpha"]}),
            )
            .await;
        admin
            .post(routes::PICTURE_UPDATE, &json!({"id": other, "tags": ["zeta"]}))
            .await;

        let client = app.anonymous();
        let res = client
            .get(&format!("{}?tags=zeta,alpha", routes::PICTURE_SEARCH))
            .await;
        assert_eq!(res.body["total"], 1, "Response: {}", res.text);
        assert_eq!(res.body["pictures"][0]["id"], tagged);
        assert_eq!(res.body["pictures"][0]["tags"], json!(["zeta", "alpha"]));

        let res = client
            .get(&format!("{}?tags=zeta", routes::PICTURE_SEARCH))
            .await;
        assert_eq!(res.body["total"], 2);

        let res = client
            .get(&format!("{}?tags=zeta,beta", routes::PICTURE_SEARCH))
            .await;
        assert_eq!(res.body["total"], 0);
    }

    #[tokio::test]
    async fn search_text_matches_name_or_introduction() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let by_name = admin.upload_png("harbour.png").await;
        let by_intro = admin.upload_png("plain.png").await;
        admin.upload_png("unrelated.png").await;
        admin
            .post(
                routes::PICTURE_UPDATE,
                &json!({"id": by_intro, "introduction": "boats in the harbour"}),
            )
            .await;

        let res = app
            .anonymous()
            .get(&format!("{}?searchText=harbour", routes::PICTURE_SEARCH))
            .await;
        assert_eq!(res.body["total"], 2, "Response: {}", res.text);
        let ids: Vec<i64> = res.body["pictures"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_i64().unwrap())
            .collect();
        assert!(ids.contains(&by_name));
        assert!(ids.contains(&by_intro));
    }

    #[tokio::test]
    async fn public_search_ignores_review_status_filter() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.register_and_login("alice", "pw1").await;
        alice.upload_png("pending.png").await;

        let res = app
            .anonymous()
            .get(&format!("{}?reviewStatus=0", routes::PICTURE_SEARCH))
            .await;
        assert_eq!(res.body["total"], 0);
    }

    #[tokio::test]
    async fn admin_query_filters_by_review_status() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.register_and_login("alice", "pw1").await;
        let admin = app.admin().await;
        let pending = alice.upload_png("pending.png").await;
        admin.upload_png("approved.png").await;

        let res = admin
            .get(&format!("{}?reviewStatus=0", routes::PICTURE_QUERY))
            .await;
        assert_eq!(res.status, 200, "Response: {}", res.text);
        assert_eq!(res.body["total"], 1);
        assert_eq!(res.body["pictures"][0]["id"], pending);
        assert_eq!(res.body["pictures"][0]["user"]["account"], "alice");

        let res = admin.get(routes::PICTURE_QUERY).await;
        assert_eq!(res.body["total"], 2);
    }

    #[tokio::test]
    async fn page_size_is_capped() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        for n in 0..3 {
            admin.upload_png(&format!("p{n}.png")).await;
        }

        let res = admin
            .get(&format!("{}?page=2&size=2", routes::PICTURE_QUERY))
            .await;
        assert_eq!(res.body["total"], 3);
        assert_eq!(res.body["pictures"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn zero_paging_falls_back_to_defaults() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        for n in 0..3 {
            admin.upload_png(&format!("p{n}.png")).await;
        }

        let zero = admin
            .get(&format!("{}?page=0&size=0", routes::PICTURE_QUERY))
            .await;
        let default = admin
            .get(&format!("{}?page=1&size=20", routes::PICTURE_QUERY))
            .await;
        assert_eq!(zero.status, 200, "Response: {}", zero.text);
        assert_eq!(zero.body["pictures"], default.body["pictures"]);
        assert_eq!(zero.body["pictures"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn admin_query_is_admin_only() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.register_and_login("alice", "pw1").await;
        assert_eq!(alice.get(routes::PICTURE_QUERY).await.code(), 40101);
        assert_eq!(app.anonymous().get(routes::PICTURE_QUERY).await.code(), 40100);
    }

    #[tokio::test]
    async fn tag_category_lists_choices() {
        let app = TestApp::spawn().await;
        let res = app.anonymous().get(routes::PICTURE_TAG_CATEGORY).await;
        assert_eq!(res.status, 200);
        assert!(!res.body["tagList"].as_array().unwrap().is_empty());
        assert!(!res.body["categoryList"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_picture_is_not_found() {
        let app = TestApp::spawn().await;
        let res = app.anonymous().get(&routes::picture_get(999)).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.code(), 40400);
    }
}

mod deletion {
    use super::*;

    #[tokio::test]
    async fn deleted_picture_disappears() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let id = admin.upload_png("gone.png").await;

        let res = admin.post(routes::PICTURE_DELETE, &json!({"id": id})).await;
        assert_eq!(res.status, 200, "Response: {}", res.text);

        assert_eq!(app.anonymous().get(&routes::picture_get(id)).await.status, 404);
        assert_eq!(admin.get(routes::PICTURE_QUERY).await.body["total"], 0);

        // The row is only flagged.
        let row = picture::Entity::find_by_id(id)
            .one(&app.db)
            .await
            .unwrap()
            .expect("row is kept");
        assert_eq!(row.is_delete, 1);

        let res = admin.post(routes::PICTURE_DELETE, &json!({"id": id})).await;
        assert_eq!(res.code(), 40400);
    }

    #[tokio::test]
    async fn owner_cannot_delete() {
        let app = TestApp::spawn().await;
        let (alice, _) = app.register_and_login("alice", "pw1").await;
        let id = alice.upload_png("mine.png").await;
        let res = alice.post(routes::PICTURE_DELETE, &json!({"id": id})).await;
        assert_eq!(res.code(), 40101);
    }
}
