use restmodel_core::{ClientErrorKind, Error};
use restmodel_http::{
    Client, ClientConfig, ClientRegistry, Gateway, Method, Request, ScriptedTransport,
    TransportResponse,
};

fn run_with(status: u16, body: &str) -> Result<restmodel_http::Response, Error> {
    let transport = ScriptedTransport::new().respond(status, body);
    let mut client = Client::new(ClientConfig::new("people", "http://api.test"))
        .with_gateway(Gateway::new(transport));
    client.run(&mut Request::get().with_url_param("person"))
}

#[test]
fn only_configured_success_codes_pass() {
    for status in [200, 201, 202] {
        let response = run_with(status, "{}").unwrap_or_else(|e| panic!("{status}: {e}"));
        assert_eq!(response.status(), status);
    }

    for status in [204, 301, 400, 404, 500, 503] {
        let err = run_with(status, r#"{"errorMessage":"nope","errorCode":"A1"}"#).unwrap_err();
        match err {
            Error::Service(e) => {
                assert_eq!(e.message, "nope");
                assert_eq!(e.code.as_deref(), Some("1"));
                assert_eq!(e.status, status);
            }
            other => panic!("{status}: unexpected error {other}"),
        }

        let err = run_with(status, "Service Unavailable").unwrap_err();
        match err {
            Error::Client(e) => {
                assert_eq!(e.kind, ClientErrorKind::HttpStatus);
                assert_eq!(e.status, Some(status));
                assert_eq!(e.body.as_deref(), Some("Service Unavailable"));
            }
            other => panic!("{status}: unexpected error {other}"),
        }
    }
}

#[test]
fn custom_success_codes() {
    let transport = ScriptedTransport::new().respond(204, "");
    let config = ClientConfig::new("people", "http://api.test").success_codes([200, 204]);
    let mut client = Client::new(config).with_gateway(Gateway::new(transport));
    assert_eq!(client.run(&mut Request::delete()).unwrap().status(), 204);
}

#[test]
fn shared_clients_run_through_the_registry() {
    let transport = ScriptedTransport::new();
    transport.push(
        TransportResponse::new(200, r#"{"payload":[]}"#).with_header("X-Request-Id: 7"),
    );
    let config = ClientConfig::new("people", "http://api.test/v2").header("Accept", "application/json");
    let registry = ClientRegistry::new();
    let shared = registry.get_or_insert_with(&config, || {
        Client::new(config.clone()).with_gateway(Gateway::new(transport.clone()))
    });

    let mut request = Request::put().with_url_param("person").with_url_param("5");
    request.add_post_param("name", "Ada");
    let response = restmodel_http::run_shared(&shared, &mut request).unwrap();
    assert_eq!(response.header("x-request-id"), Some("7"));
    assert_eq!(response.request().method(), Method::Put);

    let call = transport.last_call().unwrap();
    assert_eq!(call.url, "http://api.test/v2/person/5");
    assert_eq!(
        call.headers,
        vec![("Accept".to_string(), "application/json".to_string())]
    );
    assert_eq!(
        call.body.unwrap().field("payload"),
        Some(r#"{"name":"Ada"}"#)
    );
}
