use restmodel::prelude::*;
use restmodel::{Gateway, ModelErrorKind, ScriptedTransport, StaticSchemas, Uploads, UploadedFile};
use restmodel_core::ClientErrorKind;
use restmodel_http::{Method, TransportResponse};

fn schema() -> Schema {
    Schema::new()
        .field("id", FieldDescription::new("auto"))
        .field("name", FieldDescription::new("string").length(32))
        .field("tags", FieldDescription::new("array").nullable())
}

fn client(transport: &ScriptedTransport) -> SharedClient {
    Client::new(ClientConfig::new("people", "http://api.test/v1"))
        .with_gateway(Gateway::new(transport.clone()))
        .shared()
}

fn person(transport: &ScriptedTransport) -> Model {
    Model::builder("person")
        .schema(schema())
        .client(client(transport))
        .parser(JsonParser::new())
        .build()
        .unwrap()
}

fn loaded_person(transport: &ScriptedTransport) -> Model {
    transport.push(TransportResponse::new(200, r#"{"payload":[{"id":5,"name":"Ada"}]}"#));
    let mut model = person(transport);
    model.find(5).unwrap();
    model
}

#[test]
fn find_loads_a_record() {
    let transport = ScriptedTransport::new().respond(200, r#"{"payload":[{"id":5,"name":"Ada"}]}"#);
    let mut model = person(&transport);
    model.find(5).unwrap();

    let call = transport.last_call().unwrap();
    assert_eq!(call.method, Method::Get);
    assert_eq!(call.url, "http://api.test/v1/person?id=5");
    assert!(call.body.is_none());

    assert!(model.is_loaded());
    assert!(model.is_saved());
    assert!(!model.is_changed());
    assert_eq!(model.get("name"), Value::from("Ada"));
    assert_eq!(model.id(), Value::Int(5));
}

#[test]
fn builder_id_finds_on_build() {
    let transport = ScriptedTransport::new().respond(200, r#"{"payload":{"id":8,"name":"Bo"}}"#);
    let model = Model::builder("person")
        .schema(schema())
        .client(client(&transport))
        .parser(JsonParser::new())
        .id(8)
        .build()
        .unwrap();
    assert!(model.is_loaded());
    assert_eq!(model.get("name"), Value::from("Bo"));
}

#[test]
fn empty_find_leaves_the_model_unloaded() {
    let transport = ScriptedTransport::new().respond(200, r#"{"payload":[]}"#);
    let mut model = person(&transport);
    model.find(404).unwrap();
    assert!(!model.is_loaded());
    assert_eq!(model.get("name"), Value::Null);
}

#[test]
fn invalid_models_are_not_sent() {
    let transport = ScriptedTransport::new();
    let mut model = person(&transport);

    let err = model.save().unwrap_err();
    match err {
        Error::Model(e) => {
            assert_eq!(e.kind, ModelErrorKind::Invalid);
            assert!(e.message.contains("name"));
            let validation = e.validation.unwrap();
            assert_eq!(validation.errors.len(), 1);
            assert_eq!(validation.errors[0].field, "name");
            assert_eq!(validation.errors[0].code, "isEmpty");
        }
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(transport.call_count(), 0);
}

#[test]
fn find_all_yields_models_in_order() {
    let transport = ScriptedTransport::new().respond(
        200,
        r#"{"payload":[{"id":1,"name":"A"},{"id":2,"name":"B"}],"metadata":{"total":2}}"#,
    );
    let mut model = person(&transport);
    let results = model.find_all(Vec::<(&str, &str)>::new()).unwrap();

    assert_eq!(transport.last_call().unwrap().url, "http://api.test/v1/people");
    assert_eq!(results.len(), 2);
    assert_eq!(results.count(), 2);
    assert_eq!(results.metadata_value("total"), Some(&Value::Int(2)));

    let models: Vec<Model> = results.into_iter().collect::<Result<_>>().unwrap();
    assert_eq!(models[0].get("name"), Value::from("A"));
    assert_eq!(models[1].get("name"), Value::from("B"));
    assert!(models.iter().all(Model::is_loaded));
    assert!(!model.is_loaded());
}

#[test]
fn find_all_sends_filters_order_and_paging() {
    let transport = ScriptedTransport::new()
        .respond(200, r#"{"payload":[]}"#)
        .respond(200, r#"{"payload":[]}"#);
    let mut model = person(&transport);
    model.order_by("name", "DESC").unwrap().limit(10, 20);
    let results = model.find_all([("name", "Ada")]).unwrap();
    assert!(results.is_empty());
    assert_eq!(
        transport.last_call().unwrap().url,
        "http://api.test/v1/people?search=search&name=Ada&order=name&direction=desc&limit=10&offset=20"
    );

    // Directives apply to one dispatch only.
    model.find_all(Vec::<(&str, &str)>::new()).unwrap();
    assert_eq!(transport.last_call().unwrap().url, "http://api.test/v1/people");
}

#[test]
fn save_posts_then_puts() {
    let transport = ScriptedTransport::new()
        .respond(201, r#"{"payload":[{"id":9,"name":"Ada"}]}"#)
        .respond(200, r#"{"payload":[{"id":9,"name":"Grace"}]}"#);
    let mut model = person(&transport);

    model.set("name", "Ada").unwrap();
    model.save().unwrap();
    let call = transport.last_call().unwrap();
    assert_eq!(call.method, Method::Post);
    assert_eq!(call.url, "http://api.test/v1/person");
    assert_eq!(call.body.unwrap().field("payload"), Some(r#"{"name":"Ada"}"#));
    assert!(model.is_loaded());
    assert_eq!(model.id(), Value::Int(9));

    // Saved and unchanged: nothing goes out.
    model.save().unwrap();
    assert_eq!(transport.call_count(), 1);

    model.set("name", "Grace").unwrap();
    model.save().unwrap();
    let call = transport.last_call().unwrap();
    assert_eq!(call.method, Method::Put);
    assert_eq!(call.url, "http://api.test/v1/person/9");
    assert_eq!(transport.call_count(), 2);
    assert!(!model.is_changed());
}

#[test]
fn non_scalar_values_travel_serialized() {
    let transport = ScriptedTransport::new().respond(
        201,
        r#"{"payload":{"id":3,"name":"Ada","__serialized|tags":"[\"x\",\"y\"]"}}"#,
    );
    let mut model = person(&transport);
    model.set("name", "Ada").unwrap();
    model.set("tags", vec!["x", "y"]).unwrap();
    model.save().unwrap();

    let body = transport.last_call().unwrap().body.unwrap();
    let payload: serde_json::Value = serde_json::from_str(body.field("payload").unwrap()).unwrap();
    assert_eq!(payload["__serialized|tags"], r#"["x","y"]"#);
    assert_eq!(model.get("tags"), Value::from(vec!["x", "y"]));
}

#[test]
fn delete_resets_after_the_service_answers() {
    let transport = ScriptedTransport::new();
    let mut model = loaded_person(&transport);
    transport.push(TransportResponse::new(200, r#"{"payload":true}"#));

    model.delete().unwrap();
    let call = transport.last_call().unwrap();
    assert_eq!(call.method, Method::Delete);
    assert_eq!(call.url, "http://api.test/v1/person/5");
    assert!(!model.is_loaded());
    assert_eq!(model.id(), Value::Null);

    // Nothing loaded, nothing to delete.
    model.delete().unwrap();
    assert_eq!(transport.call_count(), 2);
}

#[test]
fn delete_failures() {
    let transport = ScriptedTransport::new();
    let mut model = loaded_person(&transport);
    transport.push(TransportResponse::new(
        404,
        r#"{"errorType":"NotFound","errorMessage":"gone","errorCode":"E404"}"#,
    ));
    let err = model.delete().unwrap_err();
    match err {
        Error::Service(e) => {
            assert_eq!(e.message, "gone");
            assert_eq!(e.status, 404);
        }
        other => panic!("unexpected error {other}"),
    }
    assert!(!model.is_loaded());

    let mut model = loaded_person(&transport);
    transport.push_failure("connection refused");
    let err = model.delete().unwrap_err();
    assert!(matches!(err, Error::Client(ref e) if e.kind == ClientErrorKind::Gateway));
    assert!(model.is_loaded());
    assert_eq!(model.get("name"), Value::from("Ada"));
}

#[test]
fn dispatch_lock_defers_requests() {
    let transport = ScriptedTransport::new();
    let mut model = person(&transport);
    model.set_dispatch_lock(true);

    model.find(5).unwrap();
    assert!(!model.is_loaded());
    let pending = model.request().unwrap();
    assert_eq!(pending.get_param("id"), Some("5"));

    let deferred = model.find_all([("name", "Ada")]).unwrap();
    assert!(deferred.is_empty());
    assert_eq!(deferred.request().unwrap().url_params(), ["people"]);
    assert_eq!(transport.call_count(), 0);
}

#[test]
fn missing_collaborators() {
    let mut model = Model::builder("person").schema(schema()).build().unwrap();
    let err = model.find(1).unwrap_err();
    assert!(matches!(err, Error::Model(ref e) if e.kind == ModelErrorKind::NoClient));

    let transport = ScriptedTransport::new();
    let mut model = Model::builder("person")
        .schema(schema())
        .client(client(&transport))
        .build()
        .unwrap();
    let err = model.find(1).unwrap_err();
    assert!(matches!(err, Error::Model(ref e) if e.kind == ModelErrorKind::NoParser));
}

#[test]
fn undecodable_replies_are_parse_errors() {
    let transport = ScriptedTransport::new().respond(200, "<html>oops</html>");
    let mut model = person(&transport);
    let err = model.find(1).unwrap_err();
    match err {
        Error::Model(e) => {
            assert_eq!(e.kind, ModelErrorKind::Parse);
            assert!(e.message.starts_with("Failed to parse the response with message : "));
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn schema_comes_from_the_client() {
    let transport = ScriptedTransport::new();
    let shared = Client::new(ClientConfig::new("people", "http://api.test/v1"))
        .with_gateway(Gateway::new(transport))
        .with_schema_source(StaticSchemas::new().with("person", schema()))
        .shared();

    let model = Model::builder("person").client(shared).build().unwrap();
    assert_eq!(model.fields().keys(), ["id", "name", "tags"]);
}

#[test]
fn uploads_are_sent_as_file_parts() {
    let incoming = tempfile::tempdir().unwrap();
    let source = incoming.path().join("php1234.tmp");
    std::fs::write(&source, b"curriculum").unwrap();

    let transport = ScriptedTransport::new().respond(201, r#"{"payload":{"id":4,"name":"Ada"}}"#);
    let mut model = Model::builder("person")
        .schema(
            schema().field(
                "cv",
                FieldDescription::new("filetransfer")
                    .autoload(true)
                    .nullable()
                    .post_filter("Filetransfer"),
            ),
        )
        .client(client(&transport))
        .parser(JsonParser::new())
        .build()
        .unwrap();

    let mut uploads = Uploads::new();
    uploads.insert("cv", UploadedFile::new("cv.txt", &source));
    assert_eq!(model.attach_uploads(&mut uploads).unwrap(), 1);
    assert_eq!(model.changed(), ["cv"]);

    model.set("name", "Ada").unwrap();
    model.save().unwrap();

    let body = transport.last_call().unwrap().body.unwrap();
    assert!(body.is_multipart());
    assert_eq!(body.files().len(), 1);
    assert_eq!(body.files()[0].name, "cv");
    assert!(body.files()[0].path.ends_with("cv.txt"));
}
