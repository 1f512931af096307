use super::testing::{portal, session, FakeIdentity, FakeImageHost};
use super::models::{NewUser, SocietyProfile};
use super::*;
use crate::auth::models::IdpCredential;
use crate::imgbb::{ImageFile, MediaField};
use crate::store::memory::MemoryStore;
use crate::store::StoreQuery;
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::atomic::Ordering;

fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected an object"),
    }
}

fn poster() -> ImageFile {
    ImageFile::new("poster.png", b"png".to_vec())
}

struct Harness {
    store: MemoryStore,
    identity: Arc<FakeIdentity>,
    images: Arc<FakeImageHost>,
    portal: Portal,
}

fn harness() -> Harness {
    harness_with(FakeImageHost::default())
}

fn harness_with(images: FakeImageHost) -> Harness {
    let store = MemoryStore::new();
    let identity = Arc::new(FakeIdentity::default());
    let images = Arc::new(images);
    let portal = portal(Arc::new(store.clone()), identity.clone(), images.clone());
    Harness {
        store,
        identity,
        images,
        portal,
    }
}

#[tokio::test]
async fn test_authenticate_persists_session() {
    let h = harness();

    let session = h.portal.authenticate("lead@sahrdaya.ac.in", "correct horse").await.unwrap();
    assert_eq!(h.portal.sessions().current().await, Some(session));
}

#[tokio::test]
async fn test_authenticate_surfaces_raw_provider_message() {
    let h = harness();

    let err = h.portal.authenticate("lead@sahrdaya.ac.in", "nope").await.unwrap_err();
    assert_eq!(err.to_string(), "INVALID_LOGIN_CREDENTIALS");
    assert!(h.portal.sessions().current().await.is_none());
}

#[tokio::test]
async fn test_oauth_rejects_outside_domain_without_writing() {
    let h = harness();
    *h.identity.idp_session.lock().unwrap() = Some(session("uid-x", "someone@gmail.com"));

    let err = h
        .portal
        .authenticate_with_oauth(&IdpCredential::google("jwt", "http://localhost"))
        .await
        .unwrap_err();

    assert!(matches!(err, PortalError::Auth(AuthError::DomainNotAllowed { .. })));
    assert_eq!(err.to_string(), "Only @sahrdaya.ac.in emails are allowed to sign up.");
    assert!(h.store.is_empty());
    assert!(h.identity.reset_emails.lock().unwrap().is_empty());
    assert!(h.portal.sessions().current().await.is_none());
}

#[tokio::test]
async fn test_oauth_provisions_first_time_student() {
    let h = harness();
    *h.identity.idp_session.lock().unwrap() = Some(session("uid-new", "new@sahrdaya.ac.in"));

    let outcome = h
        .portal
        .authenticate_with_oauth(&IdpCredential::google("jwt", "http://localhost"))
        .await
        .unwrap();

    assert!(outcome.provisioned);
    assert_eq!(outcome.destination, Destination::StudentDashboard);
    assert_eq!(outcome.destination.route(), "/studentdashboard");

    let record = h.store.get("users/uid-new").await.unwrap().unwrap();
    assert_eq!(Value::Object(record.fields), json!({"email": "new@sahrdaya.ac.in", "society": "student"}));
    assert_eq!(*h.identity.reset_emails.lock().unwrap(), vec!["new@sahrdaya.ac.in".to_string()]);
    assert_eq!(h.portal.get_role("uid-new").await.unwrap().as_deref(), Some("student"));
}

#[tokio::test]
async fn test_oauth_routes_existing_staff_to_dashboard() {
    let h = harness();
    h.store
        .set("users/uid-staff", fields(json!({"email": "lead@sahrdaya.ac.in", "club": "IEDC"})))
        .await
        .unwrap();
    *h.identity.idp_session.lock().unwrap() = Some(session("uid-staff", "lead@sahrdaya.ac.in"));

    let outcome = h
        .portal
        .authenticate_with_oauth(&IdpCredential::google("jwt", "http://localhost"))
        .await
        .unwrap();

    assert!(!outcome.provisioned);
    assert_eq!(outcome.destination, Destination::Dashboard);
    assert!(h.identity.reset_emails.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_link_requires_session() {
    let h = harness();

    let err = h.portal.link_email_password("a@sahrdaya.ac.in", "pw").await.unwrap_err();
    assert!(matches!(err, PortalError::Auth(AuthError::NoSession)));

    h.portal.authenticate("a@sahrdaya.ac.in", "correct horse").await.unwrap();
    let linked = h.portal.link_email_password("a@sahrdaya.ac.in", "pw").await.unwrap();
    assert_eq!(h.portal.sessions().current().await, Some(linked));
}

#[tokio::test]
async fn test_restore_session_refreshes_expired_token() {
    let h = harness();
    let mut stale = session("uid-1", "a@sahrdaya.ac.in");
    stale.expires_at = chrono::Utc::now() - chrono::Duration::minutes(5);
    h.portal.sessions().persist(stale).await.unwrap();

    let restored = h.portal.restore_session().await.unwrap().unwrap();
    assert_eq!(restored.id_token, "fresh");
    assert_eq!(h.identity.refreshed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_get_role_absent_is_none() {
    let h = harness();
    h.store.set("users/blank", fields(json!({"email": "x@y", "club": ""}))).await.unwrap();

    assert_eq!(h.portal.get_role("ghost").await.unwrap(), None);
    assert_eq!(h.portal.get_role("blank").await.unwrap(), None);
}

#[tokio::test]
async fn test_create_event_persists_hosted_url() {
    let h = harness();

    let id = h
        .portal
        .create_event(&fields(json!({"society": "Main", "date": "2024-05-01"})), &poster())
        .await
        .unwrap();

    let stored = h.store.get(&format!("events/{id}")).await.unwrap().unwrap();
    assert_eq!(stored.fields["mediaPath"], "https://i.ibb.co/1/poster.png");
    assert_eq!(stored.fields["society"], "Main");
}

#[tokio::test]
async fn test_failed_upload_writes_nothing() {
    let h = harness_with(FakeImageHost::failing());

    let err = h
        .portal
        .create_person(&fields(json!({"name": "Anu", "society": "Main"})), &poster())
        .await
        .unwrap_err();

    assert!(matches!(err, PortalError::Upload(_)));
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_delete_twice_reports_false_second_time() {
    let h = harness();
    let id = h
        .portal
        .create_event(&fields(json!({"society": "Main"})), &poster())
        .await
        .unwrap();

    assert!(h.portal.delete_event(&id).await);
    assert!(!h.portal.delete_event(&id).await);
    assert!(!h.portal.delete_user("never-existed").await);
}

#[tokio::test]
async fn test_event_subscription_resends_sorted_list() {
    let h = harness();
    for (society, date) in [("Main", "2024-01-10"), ("Main", "2024-03-01"), ("CS", "2024-12-01")] {
        h.store
            .add("events", fields(json!({"society": society, "date": date})))
            .await
            .unwrap();
    }

    let mut events = h.portal.subscribe_events_by_society("Main").await.unwrap();
    let first = events.next().await.unwrap().unwrap();
    let dates: Vec<_> = first.iter().map(|e| e.date.as_str()).collect();
    assert_eq!(dates, vec!["2024-03-01", "2024-01-10"]);

    h.portal
        .create_event(&fields(json!({"society": "Main", "date": "2024-02-14"})), &poster())
        .await
        .unwrap();

    let second = events.next().await.unwrap().unwrap();
    let dates: Vec<_> = second.iter().map(|e| e.date.as_str()).collect();
    assert_eq!(dates, vec!["2024-03-01", "2024-02-14", "2024-01-10"]);
    events.cancel();
}

#[tokio::test]
async fn test_spawned_subscription_invokes_callback_until_unsubscribed() {
    let h = harness();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let handle = h.portal.subscribe_all_events().await.unwrap().spawn(move |update| {
        let _ = tx.send(update.map(|events| events.len()));
    });

    assert_eq!(rx.recv().await.unwrap().unwrap(), 0);
    h.store.add("events", fields(json!({"date": "2024-01-01"}))).await.unwrap();
    assert_eq!(rx.recv().await.unwrap().unwrap(), 1);

    handle.unsubscribe();
    // The callback, and with it the sender, is dropped once the task is aborted.
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_people_subscription_orders_by_role() {
    let h = harness();
    for (name, role) in [("Meera", "Club Lead"), ("Arun", "CEO"), ("Bala", "Member"), ("Anu", "CEO")] {
        h.store
            .add("members", fields(json!({"name": name, "role": role, "society": "Main"})))
            .await
            .unwrap();
    }

    let mut people = h.portal.subscribe_people_by_society("Main").await.unwrap();
    let roster = people.next().await.unwrap().unwrap();
    let names: Vec<_> = roster.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Anu", "Arun", "Meera", "Bala"]);

    assert_eq!(h.portal.fetch_all_people().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_society_lookups_differ_on_miss() {
    let h = harness();

    let by_code = h.portal.fetch_society_data("CS").await.unwrap();
    assert_eq!(by_code, SocietyProfile::default());
    assert_eq!(
        serde_json::to_value(&by_code).unwrap(),
        json!({"aboutText": "", "backgroundImage": "", "heroImage": "", "society": "", "email": ""})
    );

    assert_eq!(h.portal.fetch_society_data_by_id("nonexistent-id").await.unwrap(), None);
}

#[tokio::test]
async fn test_society_lookups_share_shape() {
    let h = harness();
    h.store
        .set("societies/s1", fields(json!({"society": "IEDC", "aboutText": "Innovation", "email": 42})))
        .await
        .unwrap();

    let by_code = h.portal.fetch_society_data("IEDC").await.unwrap();
    let by_id = h.portal.fetch_society_data_by_id("s1").await.unwrap().unwrap();
    assert_eq!(by_code, by_id);
    assert_eq!(by_code.id.as_deref(), Some("s1"));
    assert_eq!(by_code.hero_image, "");
    assert_eq!(by_code.email, "42");
}

#[tokio::test]
async fn test_update_society_uploads_only_new_files() {
    let h = harness();
    h.store
        .set("societies/s1", fields(json!({"society": "IEDC", "email": "iedc@sahrdaya.ac.in"})))
        .await
        .unwrap();

    let update = SocietyUpdate {
        about_text: "New about".to_string(),
        background_image: MediaField::from("https://i.ibb.co/old/bg.png"),
        hero_image: MediaField::from(ImageFile::new("hero.jpg", b"jpg".to_vec())),
    };
    let applied = h.portal.update_society_data("IEDC", &update).await.unwrap();

    assert_eq!(applied.background_image, "https://i.ibb.co/old/bg.png");
    assert_eq!(applied.hero_image, "https://i.ibb.co/1/hero.jpg");
    assert_eq!(h.images.uploads.load(Ordering::SeqCst), 1);

    let profile = h.portal.fetch_society_data_by_id("s1").await.unwrap().unwrap();
    assert_eq!(profile.about_text, "New about");
    assert_eq!(profile.hero_image, "https://i.ibb.co/1/hero.jpg");
    assert_eq!(profile.email, "iedc@sahrdaya.ac.in");
}

#[tokio::test]
async fn test_update_unknown_society_is_not_found() {
    let h = harness();
    let update = SocietyUpdate {
        about_text: String::new(),
        background_image: MediaField::from(""),
        hero_image: MediaField::from(""),
    };

    let err = h.portal.update_society_data("NOPE", &update).await.unwrap_err();
    assert!(matches!(err, PortalError::NotFound(_)));
}

#[tokio::test]
async fn test_past_execom_years_and_members() {
    let h = harness();
    h.portal.create_past_execom_year("2023").await.unwrap();
    h.portal.create_past_execom_year("2024").await.unwrap();
    assert_eq!(h.portal.get_past_execom_years().await.unwrap(), vec!["2023", "2024"]);

    let picture = MediaField::from(ImageFile::new("anu.png", b"png".to_vec()));
    let id = h
        .portal
        .add_past_execom_member("2023", &fields(json!({"name": "Anu", "role": "CEO"})), Some(&picture))
        .await
        .unwrap();

    // The year marker stays empty and members do not show up as years.
    assert_eq!(h.portal.get_past_execom_years().await.unwrap().len(), 2);

    h.portal
        .update_past_execom_member(
            "2023",
            &id,
            &fields(json!({"role": "CTO"})),
            Some(&MediaField::from("https://i.ibb.co/kept.png")),
        )
        .await
        .unwrap();

    let members = h.portal.get_past_execom_members_by_year("2023").await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].name, "Anu");
    assert_eq!(members[0].role, "CTO");
    assert_eq!(members[0].media_path, "https://i.ibb.co/kept.png");
    assert_eq!(h.images.uploads.load(Ordering::SeqCst), 1);

    h.portal.delete_past_execom_member("2023", &id).await.unwrap();
    assert!(h.portal.get_past_execom_members_by_year("2023").await.unwrap().is_empty());
    assert!(h.portal.delete_past_execom_member("2023", &id).await.is_err());
}

#[tokio::test]
async fn test_gallery_newest_first() {
    let h = harness();
    h.store
        .add("gallery", fields(json!({"caption": "old", "imageUrl": "u0", "timestamp": "2020-01-01T00:00:00.000Z"})))
        .await
        .unwrap();

    let id = h
        .portal
        .add_gallery_image(&fields(json!({"caption": "fresh"})), &poster())
        .await
        .unwrap();

    let images = h.portal.fetch_gallery_images().await.unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0].id, id);
    assert_eq!(images[0].image_url, "https://i.ibb.co/1/poster.png");
    assert!(images[0].timestamp.ends_with('Z'));
    assert_eq!(images[1].extra["caption"], "old");

    h.portal
        .update_gallery_image(&id, &fields(json!({"caption": "renamed"})), None)
        .await
        .unwrap();
    let images = h.portal.fetch_gallery_images().await.unwrap();
    assert_eq!(images[0].extra["caption"], "renamed");
    assert_eq!(images[0].image_url, "https://i.ibb.co/1/poster.png");
    assert_eq!(h.images.uploads.load(Ordering::SeqCst), 1);

    let replacement = ImageFile::new("new.png", b"png".to_vec());
    h.portal
        .update_gallery_image(&id, &fields(json!({"caption": "reshot"})), Some(&replacement))
        .await
        .unwrap();
    let images = h.portal.fetch_gallery_images().await.unwrap();
    assert_eq!(images[0].id, id);
    assert_eq!(images[0].extra["caption"], "reshot");
    assert_eq!(images[0].image_url, "https://i.ibb.co/2/new.png");
    assert_eq!(h.images.uploads.load(Ordering::SeqCst), 2);

    h.portal.delete_gallery_image(&id).await.unwrap();
    assert_eq!(h.portal.fetch_gallery_images().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_upcoming_events_crud() {
    let h = harness();
    let id = h
        .portal
        .add_upcoming_event(&fields(json!({"title": "Ideathon"})))
        .await
        .unwrap();

    h.portal
        .update_upcoming_event(&id, &fields(json!({"venue": "Hall A"})))
        .await
        .unwrap();

    let upcoming = h.portal.get_upcoming_events().await.unwrap();
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].fields["title"], "Ideathon");
    assert_eq!(upcoming[0].fields["venue"], "Hall A");

    let err = h
        .portal
        .update_upcoming_event("missing", &fields(json!({"venue": "x"})))
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::NotFound(_)));

    h.portal.delete_upcoming_event(&id).await.unwrap();
    assert!(h.store.query(&StoreQuery::collection("upcoming")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_users_normalize_club() {
    let h = harness();
    h.store
        .set("users/legacy", fields(json!({"email": "old@sahrdaya.ac.in", "society": "IEDC"})))
        .await
        .unwrap();

    let id = h
        .portal
        .add_user(&NewUser::new(" Anu ", "ANU@sahrdaya.ac.in", "Main"))
        .await
        .unwrap();
    h.portal.update_user_club(&id, "IEDC").await.unwrap();

    let users = h.portal.list_users().await.unwrap();
    let clubs: Vec<_> = users.iter().map(|u| u.club.as_deref()).collect();
    assert_eq!(clubs, vec![Some("IEDC"), Some("IEDC")]);
    assert!(users.iter().any(|u| u.email == "anu@sahrdaya.ac.in" && u.name == "Anu"));
}
