//! End-to-end ingestion scenarios through the upload service and dispatcher.

#![cfg(unix)]

mod helpers;

use bytes::Bytes;

use partview_converter::ConversionJob;
use partview_core::error::ErrorKind;
use partview_database::RecordStore;
use partview_entity::file::{FileRecord, FileStatus};

use helpers::{FakeTools, Harness, assembler_script, kernel_script};

fn assert_status_invariant(record: &FileRecord) {
    if record.container_path.is_some() {
        assert_eq!(record.status, FileStatus::Completed);
    }
    if record.status == FileStatus::Completed {
        assert!(record.container_path.is_some());
    }
}

#[tokio::test]
async fn test_mesh_upload_completes_with_fallback_keyed_part() {
    let harness = Harness::new(FakeTools::default());
    let data = Bytes::from(vec![b'x'; 10 * 1024]);

    let created = harness.uploads.upload("part.stl", data).await.expect("upload");
    assert_eq!(created.status, FileStatus::Uploading);
    assert!(created.container_path.is_none());
    assert_eq!(created.size_bytes, 10 * 1024);

    let done = harness.wait_terminal(created.id).await;
    assert_eq!(done.status, FileStatus::Completed);
    assert!(done.container_path.as_deref().is_some_and(|p| p.ends_with("part.glb")));
    assert_status_invariant(&done);

    let parts = harness.stores.records.find_parts(created.id).await.unwrap();
    assert_eq!(parts.len(), 1);
    assert!(parts[0].part_key.starts_with("fallback:Body:1"));
    assert!(parts[0].display_name.is_none());
    assert_eq!(parts[0].name, "Body");
}

#[tokio::test]
async fn test_unsupported_upload_leaves_store_untouched() {
    let harness = Harness::new(FakeTools::default());

    let err = harness
        .uploads
        .upload("drawing.dwg", Bytes::from_static(b"AC1032"))
        .await
        .expect_err("rejected");
    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(harness.stores.records.list_files().await.unwrap().is_empty());
    assert_eq!(harness.dispatcher.in_flight(), 0);
}

#[tokio::test]
async fn test_solid_assembly_failure_keeps_stage_one_parts() {
    let harness = Harness::new(FakeTools {
        kernel: kernel_script(r#"{"parts":[{"partKey":"P1","name":"Housing"},{"partKey":"","name":"Bolt"}]}"#),
        assembler: assembler_script(None, 3),
        ..FakeTools::default()
    });

    let created = harness
        .uploads
        .upload("assembly.step", Bytes::from_static(b"ISO-10303-21;"))
        .await
        .expect("upload");
    let done = harness.wait_terminal(created.id).await;

    assert_eq!(done.status, FileStatus::Failed);
    assert!(done.container_path.is_none());
    assert_status_invariant(&done);

    let keys: Vec<String> = harness
        .stores
        .records
        .find_parts(created.id)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.part_key)
        .collect();
    assert_eq!(keys, vec!["P1".to_string(), "fallback:Bolt:1".to_string()]);
}

#[tokio::test]
async fn test_node_map_patches_listed_parts_only() {
    let harness = Harness::new(FakeTools {
        kernel: kernel_script(r#"{"parts":[{"partKey":"P1","name":"Lid"},{"partKey":"P2","name":"Base"}]}"#),
        assembler: assembler_script(Some(r#"[{"partKey":"P1","nodeIndex":3}]"#), 0),
        ..FakeTools::default()
    });

    let created = harness
        .uploads
        .upload("box.STP", Bytes::from_static(b"ISO-10303-21;"))
        .await
        .expect("upload");
    let done = harness.wait_terminal(created.id).await;
    assert_eq!(done.status, FileStatus::Completed);
    assert!(done.container_path.as_deref().is_some_and(|p| p.ends_with("assembly.glb")));

    let parts = harness.stores.records.find_parts(created.id).await.unwrap();
    let p1 = parts.iter().find(|p| p.part_key == "P1").expect("P1");
    let p2 = parts.iter().find(|p| p.part_key == "P2").expect("P2");
    assert_eq!(p1.node_index, Some(3));
    assert_eq!(p2.node_index, None);

    let snapshot = harness.dispatcher.pipeline().metrics().snapshot();
    assert_eq!(snapshot.node_indices_patched, 1);
    assert_eq!(snapshot.parts_written, 2);
}

#[tokio::test]
async fn test_converter_failure_fails_without_parts() {
    let harness = Harness::new(FakeTools {
        mesh: "echo 'cannot read mesh' >&2\nexit 2\n".to_string(),
        ..FakeTools::default()
    });

    let created = harness
        .uploads
        .upload("broken.obj", Bytes::from_static(b"v 0 0 0"))
        .await
        .expect("upload");
    let done = harness.wait_terminal(created.id).await;

    assert_eq!(done.status, FileStatus::Failed);
    assert!(done.container_path.is_none());
    assert!(harness.stores.records.find_parts(created.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_hung_converter_times_out() {
    let harness = Harness::new(FakeTools {
        mesh: "exec sleep 30\n".to_string(),
        timeout_seconds: 1,
        ..FakeTools::default()
    });

    let created = harness
        .uploads
        .upload("slow.ply", Bytes::from_static(b"ply"))
        .await
        .expect("upload");
    let done = harness.wait_terminal(created.id).await;

    assert_eq!(done.status, FileStatus::Failed);
    let snapshot = harness.dispatcher.pipeline().metrics().snapshot();
    assert_eq!(snapshot.timed_out, 1);
    assert_eq!(snapshot.failed, 1);
}

#[tokio::test]
async fn test_concurrent_reingestion_is_rejected() {
    let harness = Harness::new(FakeTools {
        mesh: format!("sleep 1\n{}", helpers::MESH_OK),
        ..FakeTools::default()
    });

    let created = harness
        .uploads
        .upload("part.stl", Bytes::from_static(b"solid a"))
        .await
        .expect("upload");
    assert!(harness.dispatcher.is_in_flight(created.id));

    let job = ConversionJob::new(
        created.id,
        created.stored_path.clone().into(),
        created.original_filename.clone(),
        partview_converter::ConversionFamily::Mesh,
        &harness.config.storage.temp_dir(),
        &harness.config.storage.converted_dir(),
    );
    let err = harness.dispatcher.submit(job.clone()).expect_err("conflict");
    assert_eq!(err.kind, ErrorKind::Conflict);

    let first = harness.wait_terminal(created.id).await;
    assert_eq!(first.status, FileStatus::Completed);

    // Once the first attempt is done the same file may be ingested again.
    let status = harness
        .dispatcher
        .submit(job)
        .expect("resubmit")
        .await
        .expect("join");
    assert_eq!(status, FileStatus::Completed);
    assert_eq!(harness.stores.records.find_parts(created.id).await.unwrap().len(), 1);
}
