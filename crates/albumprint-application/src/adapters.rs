// SPDX-License-Identifier: GPL-3.0-or-later

//! Production implementations of the collaborator ports.

use crate::ports::{
    CollaboratorError, CollaboratorResult, Fingerprinter, Identification, IdentificationService,
    MetadataStore,
};
use albumprint_domain::{
    CandidateTrack, RecordingId, Release, ReleaseEvent, ReleaseId, ReleaseTrack,
};
use albumprint_fingerprint::{AcoustidClient, Fingerprint, FingerprintGenerator};
use albumprint_musicbrainz::{self as musicbrainz, ArtistCredit, MusicBrainzClient, MusicBrainzError};
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

/// Album artist used when a release carries no artist credit.
pub const UNKNOWN_ARTIST: &str = "[unknown]";

/// Chromaprint over the decoded waveform.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromaprintFingerprinter {
    generator: FingerprintGenerator,
}

impl ChromaprintFingerprinter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Fingerprinter for ChromaprintFingerprinter {
    async fn fingerprint(&self, waveform: &Path) -> CollaboratorResult<Fingerprint> {
        let fingerprint = self.generator.generate_from_file(waveform).await?;
        fingerprint.validate()?;
        Ok(fingerprint)
    }
}

/// AcoustID lookups; the client carries the API key.
#[derive(Debug, Clone)]
pub struct AcoustidIdentifier {
    client: AcoustidClient,
    min_score: f32,
}

impl AcoustidIdentifier {
    pub fn new(client: AcoustidClient, min_score: f32) -> Self {
        Self { client, min_score }
    }
}

#[async_trait]
impl IdentificationService for AcoustidIdentifier {
    async fn lookup(&self, fingerprint: &Fingerprint) -> CollaboratorResult<Identification> {
        let results = self.client.lookup(fingerprint, self.min_score).await?;

        let mut identification = Identification::default();
        for recording in results.iter().flat_map(|result| result.recordings.iter()) {
            if identification.title.is_none() {
                identification.title = recording.title.clone();
            }
            if identification.artist.is_none() {
                identification.artist = recording.artist_name();
            }

            let id = RecordingId::from_uuid(recording.id);
            if !identification.candidate_ids.contains(&id) {
                identification.candidate_ids.push(id);
            }
        }

        debug!(
            target: "fingerprint",
            candidates = identification.candidate_ids.len(),
            title = identification.title.as_deref().unwrap_or(""),
            "fingerprint identified"
        );

        Ok(identification)
    }
}

/// Catalog access through the MusicBrainz web service.
#[derive(Debug, Clone)]
pub struct MusicBrainzMetadataStore {
    client: MusicBrainzClient,
}

impl MusicBrainzMetadataStore {
    pub fn new(client: MusicBrainzClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetadataStore for MusicBrainzMetadataStore {
    async fn tracks_for_candidate(
        &self,
        candidate_id: RecordingId,
    ) -> CollaboratorResult<Vec<CandidateTrack>> {
        let recording = self
            .client
            .lookup_recording(candidate_id.0)
            .await
            .map_err(not_found_as_collaborator)?;

        let releases = self
            .client
            .browse_recording_releases(candidate_id.0)
            .await
            .map_err(not_found_as_collaborator)?;

        Ok(vec![CandidateTrack {
            id: RecordingId::from_uuid(recording.id),
            title: recording.title,
            release_ids: releases
                .iter()
                .map(|release| ReleaseId::from_uuid(release.id))
                .collect(),
        }])
    }

    async fn release_by_id(&self, release_id: ReleaseId) -> CollaboratorResult<Release> {
        let release = self
            .client
            .lookup_release(release_id.0)
            .await
            .map_err(not_found_as_collaborator)?;

        Ok(release_from_musicbrainz(release))
    }
}

fn not_found_as_collaborator(err: MusicBrainzError) -> CollaboratorError {
    match err {
        MusicBrainzError::NotFound(what) => CollaboratorError::NotFound(what),
        other => other.into(),
    }
}

fn release_from_musicbrainz(release: musicbrainz::Release) -> Release {
    let album_artist =
        ArtistCredit::join(&release.artist_credit).unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

    let mut release_events: Vec<ReleaseEvent> = release
        .release_events
        .iter()
        .filter_map(|event| {
            event.date.as_ref().map(|date| ReleaseEvent {
                date: date.clone(),
                country: event.country().map(str::to_string),
            })
        })
        .collect();

    if release_events.is_empty() {
        if let Some(date) = &release.date {
            release_events.push(ReleaseEvent {
                date: date.clone(),
                country: release.country.clone(),
            });
        }
    }

    // Only keep a per-track credit when it differs from the album credit.
    let tracks = release
        .tracks()
        .map(|track| ReleaseTrack {
            title: track.title.clone(),
            artist: ArtistCredit::join(&track.artist_credit).filter(|artist| *artist != album_artist),
            recording_id: RecordingId::from_uuid(track.recording.id),
        })
        .collect();

    Release {
        id: ReleaseId::from_uuid(release.id),
        title: release.title,
        album_artist,
        release_events,
        tracks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uuid::Uuid;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RELEASE_MBID: &str = "52709206-8816-3c12-9ff6-f957f2f1eecf";
    const OTHER_RELEASE_MBID: &str = "0b6b4ba0-d36f-47bd-b4ea-6a5b91842d29";
    const FIRST_RECORDING_MBID: &str = "3a5e7c3e-2a3f-4b0e-8f3a-2d1d5a8c9e10";
    const SECOND_RECORDING_MBID: &str = "e5a3f0c4-1fae-4f2e-8f76-0c3b4f1e4fa6";
    const ARTIST_MBID: &str = "a74b1b7f-71a5-4011-9441-d0b5e4122711";
    const GUEST_MBID: &str = "8bfac288-ccc5-448d-9573-c33ea2aa5c30";

    fn uuid(value: &str) -> Uuid {
        Uuid::parse_str(value).unwrap()
    }

    fn credit(name: &str, id: &str, joinphrase: &str) -> serde_json::Value {
        serde_json::json!({
            "name": name,
            "joinphrase": joinphrase,
            "artist": { "id": id, "name": name }
        })
    }

    fn musicbrainz_store(server: &MockServer) -> MusicBrainzMetadataStore {
        let client = MusicBrainzClient::builder()
            .base_url(server.uri())
            .rate_limit_interval(Duration::from_millis(1))
            .build()
            .unwrap();
        MusicBrainzMetadataStore::new(client)
    }

    fn acoustid_identifier(server: &MockServer, min_score: f32) -> AcoustidIdentifier {
        let client = AcoustidClient::builder("test-key")
            .base_url(server.uri())
            .build()
            .unwrap();
        AcoustidIdentifier::new(client, min_score)
    }

    #[tokio::test]
    async fn identifier_flattens_recordings_best_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lookup"))
            .and(query_param("client", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok",
                "results": [
                    {
                        "id": "9ff43b6a-4f16-427c-93c2-92307ca505e0",
                        "score": 0.7,
                        "recordings": [
                            { "id": SECOND_RECORDING_MBID, "title": "Second Choice" },
                            { "id": FIRST_RECORDING_MBID }
                        ]
                    },
                    {
                        "id": "2ff4f3c2-aaf4-43c6-98ec-2f5dc0edea2c",
                        "score": 0.95,
                        "recordings": [{
                            "id": FIRST_RECORDING_MBID,
                            "title": "Airbag",
                            "artists": [{ "id": ARTIST_MBID, "name": "Radiohead" }]
                        }]
                    },
                    {
                        "id": "1ee3e2b1-99f3-52b5-87db-1f4cb9dcf61b",
                        "score": 0.2,
                        "recordings": [{ "id": "0dd2d1a0-88f2-41a4-b6da-0f3ba8caf50a" }]
                    }
                ]
            })))
            .mount(&server)
            .await;

        let identifier = acoustid_identifier(&server, 0.5);
        let identification = identifier
            .lookup(&Fingerprint::new("AQADtEmUZEkS", 284_000))
            .await
            .unwrap();

        assert_eq!(identification.title.as_deref(), Some("Airbag"));
        assert_eq!(identification.artist.as_deref(), Some("Radiohead"));
        assert_eq!(
            identification.candidate_ids,
            vec![
                RecordingId::from_uuid(uuid(FIRST_RECORDING_MBID)),
                RecordingId::from_uuid(uuid(SECOND_RECORDING_MBID)),
            ]
        );
    }

    #[tokio::test]
    async fn identifier_surfaces_service_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lookup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "error",
                "error": { "code": 4, "message": "invalid API key" }
            })))
            .mount(&server)
            .await;

        let identifier = acoustid_identifier(&server, 0.5);
        let result = identifier
            .lookup(&Fingerprint::new("AQADtEmUZEkS", 284_000))
            .await;

        assert!(matches!(result, Err(CollaboratorError::Fingerprint(_))));
    }

    #[tokio::test]
    async fn candidate_tracks_list_parent_releases() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/recording/{}", SECOND_RECORDING_MBID)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": SECOND_RECORDING_MBID,
                "title": "Paranoid Android",
                "releases": [{ "id": RELEASE_MBID, "title": "OK Computer" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/release"))
            .and(query_param("recording", SECOND_RECORDING_MBID))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "release-count": 2,
                "release-offset": 0,
                "releases": [
                    { "id": RELEASE_MBID, "title": "OK Computer" },
                    { "id": OTHER_RELEASE_MBID, "title": "OK Computer" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = musicbrainz_store(&server);
        let tracks = store
            .tracks_for_candidate(RecordingId::from_uuid(uuid(SECOND_RECORDING_MBID)))
            .await
            .unwrap();

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title, "Paranoid Android");
        assert_eq!(
            tracks[0].release_ids,
            vec![
                ReleaseId::from_uuid(uuid(RELEASE_MBID)),
                ReleaseId::from_uuid(uuid(OTHER_RELEASE_MBID)),
            ]
        );
    }

    #[tokio::test]
    async fn release_is_converted_to_catalog_release() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/release/{}", RELEASE_MBID)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": RELEASE_MBID,
                "title": "OK Computer",
                "artist-credit": [credit("Radiohead", ARTIST_MBID, "")],
                "release-events": [
                    { "date": "1997-05-21", "area": { "iso-3166-1-codes": ["GB"] } },
                    { "area": null },
                    { "date": "1997-07-01" }
                ],
                "media": [
                    {
                        "position": 2,
                        "tracks": [{
                            "id": "3f1b3c0e-7d0f-3c36-9c11-4a4b1f3a2b03",
                            "position": 1,
                            "title": "Bonus",
                            "artist-credit": [
                                credit("Radiohead", ARTIST_MBID, " feat. "),
                                credit("Guest", GUEST_MBID, "")
                            ],
                            "recording": { "id": SECOND_RECORDING_MBID, "title": "Bonus" }
                        }]
                    },
                    {
                        "position": 1,
                        "tracks": [{
                            "id": "3f1b3c0e-7d0f-3c36-9c11-4a4b1f3a2b01",
                            "position": 1,
                            "title": "Airbag",
                            "artist-credit": [credit("Radiohead", ARTIST_MBID, "")],
                            "recording": { "id": FIRST_RECORDING_MBID, "title": "Airbag" }
                        }]
                    }
                ]
            })))
            .mount(&server)
            .await;

        let store = musicbrainz_store(&server);
        let release = store
            .release_by_id(ReleaseId::from_uuid(uuid(RELEASE_MBID)))
            .await
            .unwrap();

        assert_eq!(release.title, "OK Computer");
        assert_eq!(release.album_artist, "Radiohead");
        assert_eq!(release.release_dates(), vec!["1997-05-21", "1997-07-01"]);
        assert_eq!(release.release_events[0].country.as_deref(), Some("GB"));
        assert_eq!(release.track_count(), 2);
        assert_eq!(release.tracks[0].title, "Airbag");
        assert_eq!(release.tracks[0].artist, None);
        assert_eq!(release.tracks[1].artist.as_deref(), Some("Radiohead feat. Guest"));
        assert!(release.has_recording_at(2, RecordingId::from_uuid(uuid(SECOND_RECORDING_MBID))));
    }

    #[tokio::test]
    async fn release_without_events_or_credit_uses_fallbacks() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/release/{}", RELEASE_MBID)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": RELEASE_MBID,
                "title": "Bootleg",
                "date": "2001",
                "country": "XW",
                "media": []
            })))
            .mount(&server)
            .await;

        let store = musicbrainz_store(&server);
        let release = store
            .release_by_id(ReleaseId::from_uuid(uuid(RELEASE_MBID)))
            .await
            .unwrap();

        assert_eq!(release.album_artist, UNKNOWN_ARTIST);
        assert_eq!(release.release_dates(), vec!["2001"]);
        assert_eq!(release.release_events[0].country.as_deref(), Some("XW"));
        assert_eq!(release.track_count(), 0);
    }

    #[tokio::test]
    async fn missing_release_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/release/{}", RELEASE_MBID)))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = musicbrainz_store(&server);
        let result = store
            .release_by_id(ReleaseId::from_uuid(uuid(RELEASE_MBID)))
            .await;

        assert!(matches!(result, Err(CollaboratorError::NotFound(_))));
    }

    #[tokio::test]
    async fn unreadable_waveform_is_a_fingerprint_error() {
        let result = ChromaprintFingerprinter::new()
            .fingerprint(Path::new("/nonexistent/track.wav"))
            .await;

        assert!(matches!(result, Err(CollaboratorError::Fingerprint(_))));
    }
}
