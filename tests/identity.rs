mod common;

use std::sync::Arc;

use kg_mapper::{
    cardinality::OneOrMany,
    document::Filter,
    ontology::ResourceId,
    session::Session,
    store::{InMemoryStore, Operation},
};
use serde_json::json;

use common::{document, properties, session, ORGANIZATIONS, PEOPLE, PROJECTS};

fn seed_lab(store: &InMemoryStore) -> (ResourceId, ResourceId) {
    let organization = store.insert(
        ORGANIZATIONS,
        document(json!({"@type": ["nsg:Organization"], "name": "Blue Brain Project"})),
    );
    let person = store.insert(
        PEOPLE,
        document(json!({"@type": ["nsg:Person"], "name": "Ada", "email": "ada@example.org"})),
    );
    store.insert(
        PROJECTS,
        document(json!({
            "@type": ["prov:Entity", "nsg:ModelProject"],
            "name": "CA1 model",
            "owner": {"@id": person.as_str(), "@type": ["nsg:Person"]},
            "organization": {"@id": organization.as_str(), "@type": ["nsg:Organization"]},
            "brainRegion": {"@id": "http://purl.obolibrary.org/obo/UBERON_0001954", "label": "hippocampus"},
        })),
    );
    store.insert(
        PROJECTS,
        document(json!({
            "@type": ["prov:Entity", "nsg:ModelProject"],
            "name": "CA3 model",
            "organization": {"@list": [{"@id": organization.as_str()}]},
        })),
    );
    (organization, person)
}

#[tokio::test]
async fn every_path_to_an_identifier_yields_the_same_object() {
    let (store, session) = session();
    let (organization_id, _) = seed_lab(&store);

    let via_proxy = session
        .proxy("Organization", organization_id.clone())
        .expect("proxy")
        .resolve(&session)
        .await
        .expect("proxy resolves");
    let via_name = session
        .by_name("Organization", "Blue Brain Project")
        .await
        .expect("lookup")
        .expect("found");
    let via_list = session
        .list("Organization", None, None)
        .await
        .expect("list")
        .pop()
        .expect("one organization");
    let class = session.class("Organization").expect("class");
    let via_uri = session
        .from_uri(&class, &organization_id)
        .await
        .expect("from uri");
    let via_query = session
        .query(
            "Organization",
            Filter::equals("schema:name", "Blue Brain Project"),
            json!({"schema": "http://schema.org/"}),
        )
        .expect("query")
        .resolve(&session)
        .await
        .expect("query resolves");
    let project = session
        .by_name("ModelProject", "CA1 model")
        .await
        .expect("lookup")
        .expect("found");
    let via_link = project
        .get("organization")
        .and_then(|value| value.as_proxy().cloned())
        .expect("organization proxy")
        .resolve(&session)
        .await
        .expect("link resolves");

    let OneOrMany::One(via_query) = via_query else {
        panic!("expected exactly one organization");
    };
    for other in [&via_name, &via_list, &via_uri, &via_query, &via_link] {
        assert!(Arc::ptr_eq(&via_proxy, other));
    }
    assert_eq!(store.calls(Operation::InstanceFromFullUri), 1);
}

#[tokio::test]
async fn linked_values_are_normalized_on_load() {
    let (store, session) = session();
    let (_, person_id) = seed_lab(&store);

    let project = session
        .by_name("ModelProject", "CA1 model")
        .await
        .expect("lookup")
        .expect("found");
    let owner = project.get("owners").expect("owners");
    let proxy = owner.as_proxy().expect("single owner collapses to a proxy");
    assert_eq!(proxy.id(), &person_id);
    assert_eq!(proxy.type_tags(), ["nsg:Person".to_string()]);

    let region = project.get("brain_region").expect("brain region");
    assert_eq!(region.as_term().map(|term| term.label()), Some("hippocampus"));

    let other = session
        .by_name("ModelProject", "CA3 model")
        .await
        .expect("lookup")
        .expect("found");
    assert!(other
        .get("organization")
        .expect("organization")
        .as_proxy()
        .is_some());
    assert!(other.get("owners").is_none());
    assert_eq!(store.calls(Operation::InstanceFromFullUri), 0);
}

#[tokio::test]
async fn query_results_collapse_to_one_only_for_single_matches() {
    let (store, session) = session();
    let (organization_id, person_id) = seed_lab(&store);
    let context = json!({"nsg": "https://bbp-nexus.epfl.ch/vocabs/bbp/neurosciencegraph/core/v0.1.0/"});

    let by_organization = session
        .query(
            "ModelProject",
            Filter::equals("nsg:organization", organization_id.as_str()),
            context.clone(),
        )
        .expect("query")
        .resolve(&session)
        .await
        .expect("resolves");
    assert!(matches!(&by_organization, OneOrMany::Many(projects) if projects.len() == 2));

    let by_owner = session
        .query(
            "ModelProject",
            Filter::equals("nsg:owner", person_id.as_str()),
            context.clone(),
        )
        .expect("query")
        .resolve(&session)
        .await
        .expect("resolves");
    let OneOrMany::One(owned) = by_owner else {
        panic!("expected a single project");
    };
    assert_eq!(owned.name().as_deref(), Some("CA1 model"));
    assert!(by_organization.iter().any(|project| Arc::ptr_eq(project, &owned)));

    let nothing = session
        .query(
            "ModelProject",
            Filter::equals("schema:name", "cortex model"),
            context,
        )
        .expect("query")
        .resolve(&session)
        .await
        .expect("resolves");
    assert!(matches!(nothing, OneOrMany::Many(projects) if projects.is_empty()));
}

#[tokio::test]
async fn created_objects_are_cached() {
    let (store, session) = session();
    let person = session
        .create("Person", properties([("name", "Grace")]))
        .expect("person");
    person.save(&session, false).await.expect("created");
    let id = person.id().cloned().expect("identifier adopted");

    let resolved = session
        .proxy("Person", id)
        .expect("proxy")
        .resolve(&session)
        .await
        .expect("resolves");
    assert!(Arc::ptr_eq(&person, &resolved));
    assert_eq!(store.calls(Operation::InstanceFromFullUri), 0);
}

#[tokio::test]
async fn sessions_do_not_share_objects() {
    let (store, first) = session();
    seed_lab(&store);
    let second = Session::new(common::registry(), store.clone());

    let mine = first
        .by_name("Person", "Ada")
        .await
        .expect("lookup")
        .expect("found");
    let theirs = second
        .by_name("Person", "Ada")
        .await
        .expect("lookup")
        .expect("found");
    assert!(!Arc::ptr_eq(&mine, &theirs));
    assert_eq!(mine.id(), theirs.id());
    assert_eq!(first.cache().len(), 1);
    assert_eq!(second.cache().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_resolution_converges_on_one_instance() {
    let (store, session) = session();
    let (organization_id, _) = seed_lab(&store);
    let session = Arc::new(session);

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let session = Arc::clone(&session);
            let id = organization_id.clone();
            tokio::spawn(async move {
                let proxy = session.proxy("Organization", id).expect("proxy");
                let resolved = proxy.resolve(&session).await;
                resolved
            })
        })
        .collect();

    let mut resolved = Vec::new();
    for task in tasks {
        resolved.push(task.await.expect("task").expect("resolves"));
    }
    assert!(resolved
        .windows(2)
        .all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    assert_eq!(session.cache().len(), 1);
}
