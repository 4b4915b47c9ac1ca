use rusqlite::Connection;
use scaffold_core::db::open_db_in_memory;
use scaffold_core::{
    DataErrorKind, ErrorResponse, ServiceError, Session, ShopCreate, ShopService, UserCreate,
    UserService, UserUpdate,
};
use serde_json::json;

fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .expect("row count query should succeed")
}

fn expect_data_error(err: ServiceError, kind: DataErrorKind) -> scaffold_core::DataError {
    match err {
        ServiceError::Data(data) => {
            assert_eq!(data.kind(), kind);
            data
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn register_rejects_duplicate_email_with_conflict() {
    let conn = open_db_in_memory().expect("open in-memory db");
    let mut session = Session::new(&conn);
    let users = UserService::new();

    users
        .register(&mut session, &UserCreate::new("a@b.com"))
        .expect("first registration should succeed");
    let err = users
        .register(&mut session, &UserCreate::new("a@b.com"))
        .expect_err("duplicate email should be rejected");

    let data = expect_data_error(err, DataErrorKind::Exist);
    assert_eq!(data.status_code(), 409);
    assert!(data.message().contains("email:a@b.com"));
    assert_eq!(count_rows(&conn, "users"), 1);
}

#[test]
fn register_rejects_malformed_email_with_check_error() {
    let conn = open_db_in_memory().expect("open in-memory db");
    let mut session = Session::new(&conn);

    let err = UserService::new()
        .register(&mut session, &UserCreate::new("nope"))
        .expect_err("malformed email should be rejected");

    let response = ErrorResponse::from(&err);
    assert_eq!(response.status, 400);
    assert_eq!(response.body["title"], json!("Data Check Error"));
    assert_eq!(count_rows(&conn, "users"), 0);
}

#[test]
fn get_missing_user_raises_not_exist() {
    let conn = open_db_in_memory().expect("open in-memory db");
    let mut session = Session::new(&conn);

    let err = UserService::new().get(&mut session, 42)
        .expect_err("missing user should be reported");

    let data = expect_data_error(err, DataErrorKind::NotExist);
    assert_eq!(data.status_code(), 404);
    assert!(data.message().contains("42"));
}

#[test]
fn update_rejects_email_taken_by_another_user() {
    let conn = open_db_in_memory().expect("open in-memory db");
    let mut session = Session::new(&conn);
    let users = UserService::new();
    users
        .register(&mut session, &UserCreate::new("first@b.com"))
        .expect("first registration should succeed");
    let second = users
        .register(&mut session, &UserCreate::new("second@b.com"))
        .expect("second registration should succeed");
    let second_id = second.id.expect("second user should have an id");

    let err = users
        .update(
            &mut session,
            second_id,
            UserUpdate {
                email: Some("first@b.com".to_string()),
                ..UserUpdate::default()
            },
        )
        .expect_err("taken email should be rejected");
    expect_data_error(err, DataErrorKind::Exist);

    let renamed = users
        .update(
            &mut session,
            second_id,
            UserUpdate {
                full_name: Some("Second".to_string()),
                ..UserUpdate::default()
            },
        )
        .expect("rename should succeed");
    assert_eq!(renamed.email, "second@b.com");
    assert_eq!(renamed.full_name.as_deref(), Some("Second"));
}

#[test]
fn remove_missing_user_raises_not_exist() {
    let conn = open_db_in_memory().expect("open in-memory db");
    let mut session = Session::new(&conn);

    let err = UserService::new().remove(&mut session, 9)
        .expect_err("missing user should be reported");
    expect_data_error(err, DataErrorKind::NotExist);
}

#[test]
fn open_shop_requires_existing_owner() {
    let conn = open_db_in_memory().expect("open in-memory db");
    let mut session = Session::new(&conn);

    let err = ShopService::new()
        .open(
            &mut session,
            &ShopCreate {
                owner_id: 5,
                name: "orphan".to_string(),
                settings: None,
            },
        )
        .expect_err("shop without owner should be rejected");

    let data = expect_data_error(err, DataErrorKind::NotExist);
    assert_eq!(data.name(), "user");
}

#[test]
fn open_shop_rejects_duplicate_name_for_same_owner() {
    let conn = open_db_in_memory().expect("open in-memory db");
    let mut session = Session::new(&conn);
    let owner = UserService::new()
        .register(&mut session, &UserCreate::new("o@b.com"))
        .expect("owner registration should succeed");
    let owner_id = owner.id.expect("owner should have an id");
    let shops = ShopService::new();
    let shop_in = ShopCreate {
        owner_id,
        name: "corner".to_string(),
        settings: None,
    };

    shops
        .open(&mut session, &shop_in)
        .expect("first shop should open");
    let err = shops
        .open(&mut session, &shop_in)
        .expect_err("duplicate shop should be rejected");

    let data = expect_data_error(err, DataErrorKind::Exist);
    let names: Vec<&str> = data.attrs().iter().map(|attr| attr.name.as_str()).collect();
    assert_eq!(names, vec!["owner_id", "name"]);
    assert_eq!(
        shops
            .list_for_owner(&mut session, owner_id)
            .expect("listing should succeed")
            .len(),
        1
    );
}

#[test]
fn open_with_owner_commits_both_records() {
    let conn = open_db_in_memory().expect("open in-memory db");
    let mut session = Session::new(&conn);

    let (owner, shop) = ShopService::new()
        .open_with_owner(&mut session, &UserCreate::new("new@b.com"), "first shop")
        .expect("owner and shop should be created");

    assert_eq!(Some(shop.owner_id), owner.id);
    assert!(owner.created_at.is_some());
    assert!(shop.created_at.is_some());
    assert!(!session.in_transaction());
    assert_eq!(count_rows(&conn, "users"), 1);
    assert_eq!(count_rows(&conn, "shops"), 1);
}

#[test]
fn open_with_owner_rolls_back_owner_when_shop_check_fails() {
    let conn = open_db_in_memory().expect("open in-memory db");
    let mut session = Session::new(&conn);

    let err = ShopService::new()
        .open_with_owner(&mut session, &UserCreate::new("blank@b.com"), "   ")
        .expect_err("blank shop name should be rejected");

    let data = expect_data_error(err, DataErrorKind::Check);
    assert_eq!(data.detail(), Some("shop name must not be blank"));
    assert_eq!(count_rows(&conn, "users"), 0);
    assert_eq!(count_rows(&conn, "shops"), 0);
}
