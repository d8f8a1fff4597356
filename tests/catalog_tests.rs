use chrono::{TimeZone, Utc};
use cinetheque_client::error::Error;
use cinetheque_client::movies::{MediaType, MovieFilter, MovieInput};
use cinetheque_client::users::UserPatch;
use cinetheque_client::Cinetheque;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FUTURE_EXP: i64 = 9_999_999_999;

#[derive(Serialize)]
struct TestClaims {
    id: i64,
    email: String,
    roles: Vec<String>,
    exp: i64,
}

/// Mint a real HS256 token carrying the claims the client decodes
fn mint_token(id: i64, roles: &[&str], exp: i64) -> String {
    let claims = TestClaims {
        id,
        email: format!("user{}@example.com", id),
        roles: roles.iter().map(|role| role.to_string()).collect(),
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap()
}

#[tokio::test]
async fn test_list_movies() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/movies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "@context": "/api/contexts/Movie",
            "@id": "/api/movies",
            "@type": "Collection",
            "member": [
                {
                    "@id": "/api/movies/1",
                    "id": 1,
                    "title": "Alien",
                    "description": "Un vaisseau commercial capte un signal inconnu.",
                    "duration": 117,
                    "releaseDate": "1979-09-12T00:00:00+00:00",
                    "posterUrl": "https://example.com/alien.jpg",
                    "trailer": null,
                    "type": "movie",
                    "genres": [
                        { "id": 1, "name": "Horreur" },
                        { "id": 2, "name": "Science-fiction" },
                    ],
                },
                {
                    "@id": "/api/movies/2",
                    "id": 2,
                    "title": "Dark",
                    "duration": 50,
                    "type": "series",
                },
            ],
            "totalItems": 2,
        })))
        .mount(&mock_server)
        .await;

    let client = Cinetheque::new(&mock_server.uri());

    let movies = client.movies().list(None).await.unwrap();

    assert_eq!(movies.len(), 2);
    assert_eq!(movies[0].title, "Alien");
    assert_eq!(movies[0].media_type, MediaType::Movie);
    assert_eq!(
        movies[0].release_date,
        Some(Utc.with_ymd_and_hms(1979, 9, 12, 0, 0, 0).unwrap())
    );
    assert!(movies[0].trailer.is_none());
    assert_eq!(movies[0].genres.len(), 2);
    assert_eq!(movies[1].media_type, MediaType::Series);
    assert!(movies[1].description.is_none());
    assert!(movies[1].genres.is_empty());
}

#[tokio::test]
async fn test_list_movies_sends_filter_params() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/movies"))
        .and(query_param("title", "dark"))
        .and(query_param("type", "series"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 2, "title": "Dark", "duration": 50, "type": "series" },
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Cinetheque::new(&mock_server.uri());

    let filter = MovieFilter::new()
        .with_title("dark")
        .with_media_type(MediaType::Series);
    let movies = client.movies().list(Some(&filter)).await.unwrap();

    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0].title, "Dark");
}

#[tokio::test]
async fn test_list_movies_narrows_genres_client_side() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/movies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 1,
                "title": "Alien",
                "duration": 117,
                "type": "movie",
                "genres": [ { "id": 1, "name": "Horreur" } ],
            },
            {
                "id": 2,
                "title": "Dune",
                "duration": 155,
                "type": "movie",
                "genres": [ { "id": 2, "name": "Science-fiction" } ],
            },
        ])))
        .mount(&mock_server)
        .await;

    let client = Cinetheque::new(&mock_server.uri());

    let filter = MovieFilter::new().with_genre("Horreur");
    let movies = client.movies().list(Some(&filter)).await.unwrap();

    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0].title, "Alien");
}

#[tokio::test]
async fn test_get_movie() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/movies/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "@context": "/api/contexts/Movie",
            "@id": "/api/movies/1",
            "id": 1,
            "title": "Alien",
            "duration": 117,
            "type": "movie",
            "genres": [ { "id": 1, "name": "Horreur" } ],
        })))
        .mount(&mock_server)
        .await;

    let client = Cinetheque::new(&mock_server.uri());

    let movie = client.movies().get(1).await.unwrap();

    assert_eq!(movie.id, 1);
    assert_eq!(movie.genres[0].name, "Horreur");
}

#[tokio::test]
async fn test_create_movie() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/movies"))
        .and(body_json(json!({
            "title": "Alien",
            "duration": 117,
            "type": "movie",
            "description": "Un huis clos spatial.",
            "releaseDate": "1979-09-12T00:00:00Z",
            "genres": ["/api/genres/1"],
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 1,
            "title": "Alien",
            "description": "Un huis clos spatial.",
            "duration": 117,
            "releaseDate": "1979-09-12T00:00:00+00:00",
            "type": "movie",
            "genres": [ { "id": 1, "name": "Horreur" } ],
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Cinetheque::new(&mock_server.uri());

    let input = MovieInput::new("Alien", 117, MediaType::Movie)
        .with_description("Un huis clos spatial.")
        .with_release_date(Utc.with_ymd_and_hms(1979, 9, 12, 0, 0, 0).unwrap())
        .with_genre("/api/genres/1");
    let movie = client.movies().create(&input).await.unwrap();

    assert_eq!(movie.id, 1);
    assert_eq!(movie.description.as_deref(), Some("Un huis clos spatial."));
}

#[tokio::test]
async fn test_update_movie() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/api/movies/1"))
        .and(body_json(json!({
            "title": "Alien",
            "duration": 117,
            "type": "movie",
            "trailer": "https://example.com/trailer.mp4",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "title": "Alien",
            "duration": 117,
            "type": "movie",
            "trailer": "https://example.com/trailer.mp4",
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Cinetheque::new(&mock_server.uri());

    let input =
        MovieInput::new("Alien", 117, MediaType::Movie).with_trailer("https://example.com/trailer.mp4");
    let movie = client.movies().update(1, &input).await.unwrap();

    assert_eq!(
        movie.trailer.as_deref(),
        Some("https://example.com/trailer.mp4")
    );
}

#[tokio::test]
async fn test_delete_movie() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/movies/1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Cinetheque::new(&mock_server.uri());

    client.movies().delete(1).await.unwrap();
}

#[tokio::test]
async fn test_genres_crud() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/genres"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "name": "Horreur" },
            { "id": 2, "name": "Drame" },
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/genres"))
        .and(body_json(json!({ "name": "Polar" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 3,
            "name": "Polar",
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/genres/3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Cinetheque::new(&mock_server.uri());

    let genres = client.genres().list().await.unwrap();
    assert_eq!(genres.len(), 2);
    assert_eq!(genres[0].name, "Horreur");

    let created = client.genres().create("Polar").await.unwrap();
    assert_eq!(created.id, 3);

    client.genres().delete(3).await.unwrap();
}

#[tokio::test]
async fn test_list_users() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "member": [
                {
                    "id": 42,
                    "email": "user42@example.com",
                    "roles": ["ROLE_USER"],
                    "movies": ["/api/movies/7"],
                },
                {
                    "id": 7,
                    "email": "admin@example.com",
                    "roles": ["ROLE_USER", "ROLE_ADMIN"],
                },
            ],
        })))
        .mount(&mock_server)
        .await;

    let client = Cinetheque::new(&mock_server.uri());

    let users = client.users().list().await.unwrap();

    assert_eq!(users.len(), 2);
    assert_eq!(users[0].movies, vec!["/api/movies/7"]);
    assert!(users[1].roles.contains(&"ROLE_ADMIN".to_string()));
}

#[tokio::test]
async fn test_toggle_favorite_adds_a_movie() {
    let mock_server = MockServer::start().await;
    let token = mint_token(42, &["ROLE_USER"], FUTURE_EXP);

    Mock::given(method("GET"))
        .and(path("/api/users/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "email": "user42@example.com",
            "movies": ["/api/movies/7"],
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/api/users/42"))
        .and(body_json(json!({
            "movies": ["/api/movies/7", "/api/movies/3"],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "email": "user42@example.com",
            "movies": ["/api/movies/7", "/api/movies/3"],
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Cinetheque::new(&mock_server.uri());
    assert!(client.auth().set_session(&token, "refresh-1"));
    client.auth().fetch_user(42).await.unwrap();

    let users = client.users();
    assert!(!users.is_favorite(3));

    let favorites = users.toggle_favorite(3).await.unwrap();

    assert_eq!(favorites, vec!["/api/movies/7", "/api/movies/3"]);
    assert!(users.is_favorite(3));
    assert!(client
        .auth()
        .current_user()
        .unwrap()
        .movies
        .contains(&"/api/movies/3".to_string()));
}

#[tokio::test]
async fn test_toggle_favorite_removes_a_movie() {
    let mock_server = MockServer::start().await;
    let token = mint_token(42, &["ROLE_USER"], FUTURE_EXP);

    Mock::given(method("GET"))
        .and(path("/api/users/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "email": "user42@example.com",
            "movies": ["/api/movies/3"],
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/api/users/42"))
        .and(body_json(json!({ "movies": [] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "email": "user42@example.com",
            "movies": [],
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Cinetheque::new(&mock_server.uri());
    assert!(client.auth().set_session(&token, "refresh-1"));
    client.auth().fetch_user(42).await.unwrap();

    let users = client.users();
    assert!(users.is_favorite(3));

    let favorites = users.toggle_favorite(3).await.unwrap();

    assert!(favorites.is_empty());
    assert!(!users.is_favorite(3));
}

#[tokio::test]
async fn test_toggle_favorite_requires_a_user() {
    let client = Cinetheque::new("http://localhost:8000");

    let err = client.users().toggle_favorite(3).await.unwrap_err();

    match err {
        Error::Auth(message) => assert_eq!(message, "Utilisateur non connecté"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_updating_the_current_user_syncs_the_session() {
    let mock_server = MockServer::start().await;
    let token = mint_token(42, &["ROLE_USER"], FUTURE_EXP);

    Mock::given(method("GET"))
        .and(path("/api/users/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "email": "user42@example.com",
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/api/users/42"))
        .and(body_json(json!({ "email": "renamed@example.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "email": "renamed@example.com",
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/api/users/7"))
        .and(body_json(json!({ "email": "other@example.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "email": "other@example.com",
        })))
        .mount(&mock_server)
        .await;

    let client = Cinetheque::new(&mock_server.uri());
    assert!(client.auth().set_session(&token, "refresh-1"));
    client.auth().fetch_user(42).await.unwrap();

    let patch = UserPatch {
        email: Some("renamed@example.com".to_string()),
        movies: None,
    };
    client.users().update(42, &patch).await.unwrap();
    assert_eq!(
        client.auth().current_user().unwrap().email,
        "renamed@example.com"
    );

    // touching another user leaves the session user alone
    let patch = UserPatch {
        email: Some("other@example.com".to_string()),
        movies: None,
    };
    client.users().update(7, &patch).await.unwrap();
    assert_eq!(
        client.auth().current_user().unwrap().email,
        "renamed@example.com"
    );
}
