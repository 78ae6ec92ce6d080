use portico_core::{
    Controller, ControllerDescriptor, Error, FieldKind, HandlerOutput, HttpMethod, RouteDescriptor, RouteStore,
    match_path, resolve,
};

struct UserController;

impl Controller for UserController {
    fn name(&self) -> &str {
        "UserController"
    }

    fn routes(&self) -> Result<Vec<RouteDescriptor>, Error> {
        Ok(vec![
            RouteDescriptor::builder(self.name(), "profile")
                .url("/user")
                .handler(|_| async { Ok(HandlerOutput::text("profile")) })
                .build()?,
            RouteDescriptor::builder(self.name(), "show")
                .get("/user/{id}")
                .path_var("id", FieldKind::Integer)
                .handler(|_| async { Ok(HandlerOutput::text("show")) })
                .build()?,
            RouteDescriptor::builder(self.name(), "update")
                .post("/user/{id}/edit")
                .path_var("id", FieldKind::Integer)
                .handler(|_| async { Ok(HandlerOutput::text("update")) })
                .build()?,
        ])
    }
}

fn store() -> RouteStore {
    let mut store = RouteStore::new();
    store.register(&UserController).unwrap();
    store
}

#[test]
fn test_legacy_prefix_rule() {
    let result = match_path("/user", "/user/45");
    assert!(result.is_match);
    assert!(!result.is_dynamic);
    assert!(result.variables.is_empty());

    assert!(!match_path("/user", "/user/45/edit").is_match);
    assert!(!match_path("/user/{id}", "/user").is_match);
}

#[test]
fn test_path_variable_binding() {
    let result = match_path("/user/{id}", "/user/45");
    assert!(result.is_match);
    assert!(result.is_dynamic);
    assert_eq!(result.variables.get("id").map(String::as_str), Some("45"));
}

#[test]
fn test_method_agnostic_pass_runs_first() {
    let store = store();

    // `/user` matches `/user/45` through the legacy rule before the GET pass runs
    let resolved = resolve(&store, Some(HttpMethod::GET), "/user/45").unwrap();
    assert_eq!(resolved.route.handler_name, "profile");
    assert!(resolved.variables.is_empty());
}

#[test]
fn test_method_specific_mapping() {
    let store = store();

    let resolved = resolve(&store, Some(HttpMethod::POST), "/user/9/edit").unwrap();
    assert_eq!(resolved.route.handler_name, "update");
    assert_eq!(resolved.variables["id"], "9");

    assert!(resolve(&store, Some(HttpMethod::GET), "/user/9/edit").is_none());
    assert!(resolve(&store, None, "/user/9/edit").is_none());
}

#[test]
fn test_dynamic_beats_static_in_same_pass() {
    let controller = ControllerDescriptor::new("Items")
        .route(
            RouteDescriptor::builder("Items", "list")
                .get("/item")
                .handler(|_| async { Ok(HandlerOutput::text("list")) })
                .build()
                .unwrap(),
        )
        .route(
            RouteDescriptor::builder("Items", "show")
                .get("/item/{id}")
                .path_var("id", FieldKind::Text)
                .handler(|_| async { Ok(HandlerOutput::text("show")) })
                .build()
                .unwrap(),
        );
    let mut store = RouteStore::new();
    store.add_controller(controller);

    let resolved = resolve(&store, Some(HttpMethod::GET), "/item/9").unwrap();
    assert_eq!(resolved.route.handler_name, "show");
    assert_eq!(resolved.pattern.as_str(), "/item/{id}");

    let resolved = resolve(&store, Some(HttpMethod::GET), "/item").unwrap();
    assert_eq!(resolved.route.handler_name, "list");
}

#[test]
fn test_first_controller_with_a_match_wins() {
    let first = ControllerDescriptor::new("First").route(
        RouteDescriptor::builder("First", "a")
            .get("/shared")
            .handler(|_| async { Ok(HandlerOutput::text("a")) })
            .build()
            .unwrap(),
    );
    let second = ControllerDescriptor::new("Second").route(
        RouteDescriptor::builder("Second", "b")
            .get("/shared/{x}")
            .path_var("x", FieldKind::Text)
            .handler(|_| async { Ok(HandlerOutput::text("b")) })
            .build()
            .unwrap(),
    );
    let mut store = RouteStore::new();
    store.add_controller(first);
    store.add_controller(second);

    // the first controller's static match is kept even though the second has a dynamic one
    let resolved = resolve(&store, Some(HttpMethod::GET), "/shared/1").unwrap();
    assert_eq!(resolved.route.owner, "First");
}
