//! Fixture documents shared by the backend suites.

use serde_json::{Value, json};

/// A service fixture.
#[derive(Debug, Clone)]
pub struct ServiceFixture {
    /// Service id.
    pub id: String,
    /// Service name.
    pub name: String,
    /// Lifecycle state; `None` leaves the field out.
    pub state: Option<Value>,
    /// Integer version.
    pub version: Option<Value>,
    /// Start date, RFC 3339.
    pub start_date: Option<String>,
    /// Bundle flag.
    pub is_bundle: bool,
    /// Specification reference id.
    pub specification: Option<String>,
}

impl ServiceFixture {
    /// Creates a fixture with only an id and name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            state: None,
            version: None,
            start_date: None,
            is_bundle: false,
            specification: None,
        }
    }

    /// Sets the state.
    pub fn with_state(mut self, state: Value) -> Self {
        self.state = Some(state);
        self
    }

    /// Sets the version.
    pub fn with_version(mut self, version: Value) -> Self {
        self.version = Some(version);
        self
    }

    /// Sets the start date.
    pub fn with_start_date(mut self, date: impl Into<String>) -> Self {
        self.start_date = Some(date.into());
        self
    }

    /// Marks the service as a bundle.
    pub fn bundle(mut self) -> Self {
        self.is_bundle = true;
        self
    }

    /// Sets the specification reference.
    pub fn with_specification(mut self, id: impl Into<String>) -> Self {
        self.specification = Some(id.into());
        self
    }

    /// Builds the stored document.
    pub fn to_json(&self) -> Value {
        let mut doc = json!({
            "id": self.id,
            "href": format!("http://localhost/tmf-api/serviceInventory/v4/service/{}", self.id),
            "@type": "Service",
            "name": self.name,
            "isBundle": self.is_bundle,
        });
        if let Some(state) = &self.state {
            doc["state"] = state.clone();
        }
        if let Some(version) = &self.version {
            doc["version"] = version.clone();
        }
        if let Some(date) = &self.start_date {
            doc["startDate"] = json!(date);
        }
        if let Some(spec) = &self.specification {
            doc["serviceSpecification"] = json!({"id": spec, "name": format!("spec {}", spec)});
        }
        doc
    }
}

/// The standard service set, in insertion order.
///
/// Chosen so that every operator has both matches and non-matches, some
/// fields are missing or null, and sort keys contain ties.
pub fn services() -> Vec<ServiceFixture> {
    vec![
        ServiceFixture::new("svc-01", "alpha")
            .with_state(json!("active"))
            .with_version(json!(1))
            .with_start_date("2024-01-10T08:00:00.000Z")
            .with_specification("spec-a"),
        ServiceFixture::new("svc-02", "bravo")
            .with_state(json!("inactive"))
            .with_version(json!(2))
            .with_start_date("2024-02-15T12:30:00.000Z")
            .bundle(),
        ServiceFixture::new("svc-03", "charlie")
            .with_state(json!("active"))
            .with_version(json!(2))
            .with_start_date("2024-03-01T00:00:00.000Z")
            .with_specification("spec-b"),
        ServiceFixture::new("svc-04", "delta").with_version(json!(3)),
        ServiceFixture::new("svc-05", "echo")
            .with_state(Value::Null)
            .with_version(json!("4"))
            .with_start_date("not a date"),
        ServiceFixture::new("svc-06", "foxtrot")
            .with_state(json!("terminated"))
            .with_version(json!(2.5))
            .with_start_date("2024-03-01T02:00:00+02:00")
            .bundle()
            .with_specification("spec-a"),
        ServiceFixture::new("svc-07", "alpha")
            .with_state(json!("active"))
            .with_version(json!(1)),
    ]
}
