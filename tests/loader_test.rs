//! Loading route declarations from disk and over HTTP.

use http::Method;
use param_binder::{load_routes, load_routes_auto, LoadError, SpecError};
use tempfile::TempDir;

const ROUTES: &str = r#"{
    "routes": [
        {"method": "GET", "path": "/users/{user_id}", "params": [
            {"name": "user_id", "in": "path", "type": "integer", "gt": 0},
            {"name": "fields", "in": "query", "type": {"array": "string"}, "required": false}
        ]}
    ]
}"#;

#[test]
fn auto_loads_file_paths() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("routes.json");
    std::fs::write(&path, ROUTES).unwrap();

    let router = load_routes_auto(path.to_str().unwrap()).unwrap();
    let bound = router
        .bind(&Method::GET, "/users/9?fields=name&fields=email", None)
        .unwrap();
    assert_eq!(bound.get_as::<i64>("user_id").unwrap(), 9);
    assert_eq!(
        bound.get_as::<Vec<String>>("fields").unwrap(),
        ["name", "email"]
    );
}

#[test]
fn duplicate_routes_in_document() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("routes.json");
    std::fs::write(
        &path,
        r#"{"routes": [
            {"method": "GET", "path": "/items/", "params": []},
            {"method": "get", "path": "/items", "params": []}
        ]}"#,
    )
    .unwrap();

    let result = load_routes(&path);
    assert!(matches!(
        result,
        Err(LoadError::Spec(SpecError::DuplicateRoute { .. }))
    ));
}

#[test]
fn missing_file() {
    let result = load_routes_auto("/nonexistent/routes.json");
    assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
}

#[cfg(feature = "remote")]
mod remote {
    use super::*;
    use param_binder::load_routes_url;

    #[test]
    fn loads_from_url() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/routes.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(ROUTES)
            .create();

        let url = format!("{}/routes.json", server.url());
        let router = load_routes_auto(&url).unwrap();
        mock.assert();

        assert_eq!(router.routes().len(), 1);
        assert_eq!(router.routes()[0].path(), "/users/{user_id}");
        assert!(router.bind(&Method::GET, "/users/0", None).is_err());
    }

    #[test]
    fn http_error_status() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/missing.json")
            .with_status(404)
            .create();

        let url = format!("{}/missing.json", server.url());
        let err = load_routes_url(&url).unwrap_err();
        assert!(matches!(err, LoadError::NetworkError { .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn invalid_remote_document() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/routes.json")
            .with_status(200)
            .with_body(r#"{"paths": {}}"#)
            .create();

        let url = format!("{}/routes.json", server.url());
        let err = load_routes_url(&url).unwrap_err();
        assert!(matches!(err, LoadError::InvalidDocument { .. }));
        assert_eq!(err.exit_code(), 2);
    }
}
