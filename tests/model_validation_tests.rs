use chrono::Utc;
use inkwell_cms::models::{
    AuthorSummary, CreatePostRequest, CreateUserRequest, Post, PostWithAuthor, ProfileChanges,
    PublicAuthor, Role, SessionResponse, SessionUser, SiteSettings, SiteSettingsRecord,
    UpdateProfileRequest, UpdateUserRequest, User, UserRecord, UserWithProfile,
};
use serde_json::{Value, json};
use uuid::Uuid;

// --- Test Utilities ---

fn sample_record() -> UserRecord {
    let now = Utc::now();
    UserRecord {
        id: Uuid::new_v4(),
        email: "writer@inkwell.test".to_string(),
        name: Some("Writer".to_string()),
        password: "$2b$04$hash".to_string(),
        role: Role::Admin,
        created_at: now,
        updated_at: now,
    }
}

// --- Tests ---

#[test]
fn test_role_wire_format() {
    assert_eq!(serde_json::to_value(Role::User).unwrap(), json!("USER"));
    assert_eq!(serde_json::to_value(Role::Admin).unwrap(), json!("ADMIN"));

    let parsed: Role = serde_json::from_value(json!("ADMIN")).unwrap();
    assert!(parsed.is_admin());
    assert!(serde_json::from_value::<Role>(json!("admin")).is_err());
    assert_eq!(Role::default(), Role::User);
}

#[test]
fn test_user_from_record_drops_password() {
    let record = sample_record();
    let id = record.id;
    let user = User::from(record);

    let value = serde_json::to_value(&user).unwrap();
    assert_eq!(value["id"], json!(id));
    assert_eq!(value["role"], json!("ADMIN"));
    assert!(value.get("password").is_none());
}

#[test]
fn test_user_with_profile_is_flat() {
    let user = User::from(sample_record());
    let value = serde_json::to_value(UserWithProfile {
        user,
        profile: None,
    })
    .unwrap();

    // User fields sit beside `profile`, not under a nested key.
    assert_eq!(value["email"], json!("writer@inkwell.test"));
    assert_eq!(value["profile"], Value::Null);
    assert!(value.get("user").is_none());
}

#[test]
fn test_post_with_author_shape() {
    let now = Utc::now();
    let author_id = Uuid::new_v4();
    let post = PostWithAuthor {
        post: Post {
            id: Uuid::new_v4(),
            title: "Hello".to_string(),
            slug: "hello-0042".to_string(),
            content: "# Hi".to_string(),
            published: false,
            author_id,
            created_at: now,
            updated_at: now,
        },
        author: AuthorSummary {
            id: author_id,
            name: None,
            email: "writer@inkwell.test".to_string(),
        },
    };

    let value = serde_json::to_value(&post).unwrap();
    assert_eq!(value["slug"], json!("hello-0042"));
    assert_eq!(value["author_id"], json!(author_id));
    assert_eq!(value["author"]["email"], json!("writer@inkwell.test"));
}

#[test]
fn test_public_author_omits_missing_bio() {
    let listed = PublicAuthor {
        id: Uuid::new_v4(),
        name: Some("Writer".to_string()),
        bio: None,
    };
    let value = serde_json::to_value(&listed).unwrap();
    assert!(value.get("bio").is_none());
    assert!(value.get("email").is_none());

    let single = PublicAuthor {
        bio: Some("Hello".to_string()),
        ..listed
    };
    assert_eq!(serde_json::to_value(&single).unwrap()["bio"], json!("Hello"));
}

#[test]
fn test_site_settings_never_carry_bytes() {
    let mut record = SiteSettingsRecord::with_defaults();
    assert_eq!(record.id, "site-settings");
    assert_eq!(record.logo_text, "MyApp");
    assert!(!SiteSettings::from(&record).has_logo);

    record.logo_image = Some(vec![1, 2, 3]);
    record.logo_mime_type = Some("image/png".to_string());
    let value = serde_json::to_value(SiteSettings::from(&record)).unwrap();

    assert_eq!(value["has_logo"], json!(true));
    assert_eq!(value["logo_mime_type"], json!("image/png"));
    assert!(value.get("logo_image").is_none());
}

#[test]
fn test_session_response_null_user() {
    let anonymous = SessionResponse { user: None };
    assert_eq!(serde_json::to_value(&anonymous).unwrap(), json!({"user": null}));

    let id = Uuid::new_v4();
    let signed_in = SessionResponse {
        user: Some(SessionUser {
            id,
            role: Role::User,
        }),
    };
    assert_eq!(
        serde_json::to_value(&signed_in).unwrap(),
        json!({"user": {"id": id, "role": "USER"}})
    );
}

#[test]
fn test_request_payloads_tolerate_missing_fields() {
    // Missing required strings come through empty so the handler can answer 400.
    let create: CreateUserRequest = serde_json::from_value(json!({})).unwrap();
    assert!(create.email.is_empty());
    assert!(create.password.is_empty());
    assert!(create.role.is_none());

    let post: CreatePostRequest = serde_json::from_value(json!({"title": "Only title"})).unwrap();
    assert_eq!(post.title, "Only title");
    assert!(post.content.is_empty());
    assert!(!post.published);
    assert!(post.author_id.is_none());
}

#[test]
fn test_update_user_request_distinguishes_absent_fields() {
    let req: UpdateUserRequest =
        serde_json::from_value(json!({"role": "ADMIN", "password": ""})).unwrap();

    assert_eq!(req.role, Some(Role::Admin));
    assert_eq!(req.password.as_deref(), Some(""));
    assert!(req.name.is_none());
    assert!(req.email.is_none());
    assert!(req.bio.is_none());
}

#[test]
fn test_profile_request_maps_to_changes() {
    let req: UpdateProfileRequest = serde_json::from_value(json!({
        "bio": "Writes things",
        "github_handle": "inkwell"
    }))
    .unwrap();
    let changes = ProfileChanges::from(req);

    assert_eq!(changes.bio.as_deref(), Some("Writes things"));
    assert_eq!(changes.github_handle.as_deref(), Some("inkwell"));
    assert!(changes.name.is_none());
    assert!(changes.website.is_none());
}
