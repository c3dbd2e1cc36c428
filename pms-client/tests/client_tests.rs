//! HTTP-level tests for the media-server client against a local mock server

use mockito::{Matcher, Server};
use pms_client::{ClientIdentity, PmsClient, PmsError};

const SECTIONS_XML: &str = r#"<MediaContainer size="2" title1="Plex Library">
    <Directory key="1" type="movie" title="Movies"/>
    <Directory key="2" type="show" title="TV Shows"/>
</MediaContainer>"#;

#[test]
fn test_fetch_parses_document_and_sends_token() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/library/sections")
        .match_header("X-Plex-Token", "secret")
        .match_header("X-Plex-Client-Identifier", "atv-1")
        .with_status(200)
        .with_header("content-type", "text/xml")
        .with_body(SECTIONS_XML)
        .create();

    let client = PmsClient::new();
    let root = client
        .fetch(&server.url(), "/library/sections", &ClientIdentity::new("atv-1"), "secret")
        .expect("fetch should succeed");

    mock.assert();
    assert_eq!(root.name, "MediaContainer");
    assert_eq!(root.attributes.get("size").map(String::as_str), Some("2"));
    assert_eq!(root.children.iter().filter(|n| n.as_element().is_some()).count(), 2);
}

#[test]
fn test_fetch_without_token_omits_header() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/library/sections")
        .match_header("X-Plex-Token", Matcher::Missing)
        .with_status(200)
        .with_body(SECTIONS_XML)
        .create();

    let client = PmsClient::new();
    let result = client.fetch(&server.url(), "/library/sections", &ClientIdentity::default(), "");

    mock.assert();
    assert!(result.is_ok());
}

#[test]
fn test_fetch_maps_http_status() {
    let mut server = Server::new();
    let _mock = server.mock("GET", "/library/metadata/99").with_status(404).create();

    let client = PmsClient::new();
    let result = client.fetch(&server.url(), "/library/metadata/99", &ClientIdentity::default(), "");

    assert!(matches!(result, Err(PmsError::Status(404))));
}

#[test]
fn test_fetch_rejects_malformed_xml() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/broken")
        .with_status(200)
        .with_body("<MediaContainer><Directory></MediaContainer>")
        .create();

    let client = PmsClient::new();
    let result = client.fetch(&server.url(), "/broken", &ClientIdentity::default(), "");

    assert!(matches!(result, Err(PmsError::Parse(_))));
}
