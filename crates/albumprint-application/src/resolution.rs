// SPDX-License-Identifier: GPL-3.0-or-later

//! Release resolution: find the releases whose track list lines up with the
//! observed tracks, position by position.
//!
//! Every (position, candidate, release) pairing is tested in position order.
//! A release survives position `t` only if it confirmed every position before
//! it, has exactly as many tracks as the directory, and carries the candidate
//! at position `t`. Once a release misses a position it can never recover.

use crate::ports::MetadataStore;
use albumprint_config::PositionMatch;
use albumprint_domain::{CandidateTrack, Release, ReleaseHypothesis, ReleaseId, TrackObservation};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct ReleaseResolver {
    metadata: Arc<dyn MetadataStore>,
    position_match: PositionMatch,
}

impl ReleaseResolver {
    pub fn new(metadata: Arc<dyn MetadataStore>, position_match: PositionMatch) -> Self {
        Self {
            metadata,
            position_match,
        }
    }

    /// Releases consistent with every observation, best supported first.
    ///
    /// An empty result means no single release explains the whole directory.
    #[instrument(skip_all, target = "resolution", fields(tracks = observations.len()))]
    pub async fn resolve(&self, observations: &[TrackObservation]) -> Vec<ReleaseHypothesis> {
        let track_count = observations.len();
        let mut hypotheses: HashMap<ReleaseId, ReleaseHypothesis> = HashMap::new();

        for observation in observations {
            let position = observation.position;

            for candidate in &observation.candidates {
                for release_id in &candidate.release_ids {
                    if !Self::continues_chain(&hypotheses, *release_id, position) {
                        continue;
                    }

                    let Some(release) = self.fetch_release(*release_id).await else {
                        continue;
                    };

                    if release.track_count() != track_count {
                        debug!(
                            target: "resolution",
                            release_id = %release_id,
                            release_tracks = release.track_count(),
                            track_count,
                            "track count mismatch"
                        );
                        continue;
                    }

                    if !self.matches_at(&release, position, candidate) {
                        debug!(
                            target: "resolution",
                            release_id = %release_id,
                            candidate_id = %candidate.id,
                            position,
                            "candidate not at this position"
                        );
                        continue;
                    }

                    hypotheses
                        .entry(*release_id)
                        .or_insert_with(|| ReleaseHypothesis::new(*release_id))
                        .confirm(position);
                }
            }

            let alive = hypotheses
                .values()
                .filter(|hypothesis| hypothesis.consecutive_match_count() == position)
                .count();
            debug!(target: "resolution", position, alive, "position resolved");

            // Continuity can only be regained by a hypothesis confirmed here.
            if alive == 0 {
                info!(target: "resolution", position, "no release explains this track");
                return Vec::new();
            }
        }

        let mut survivors: Vec<ReleaseHypothesis> = hypotheses
            .into_values()
            .filter(|hypothesis| hypothesis.consecutive_match_count() as usize == track_count)
            .collect();

        survivors.sort_by(|left, right| {
            right
                .support()
                .cmp(&left.support())
                .then_with(|| left.release_id.cmp(&right.release_id))
        });

        info!(target: "resolution", matches = survivors.len(), "resolution finished");
        survivors
    }

    /// Position 1 seeds any release. Later positions only extend a release
    /// whose unbroken run reaches the previous position, or that another
    /// candidate already confirmed at this one.
    fn continues_chain(
        hypotheses: &HashMap<ReleaseId, ReleaseHypothesis>,
        release_id: ReleaseId,
        position: u32,
    ) -> bool {
        if position == 1 {
            return true;
        }

        hypotheses
            .get(&release_id)
            .map(|hypothesis| {
                let count = hypothesis.consecutive_match_count();
                count == position - 1 || count == position
            })
            .unwrap_or(false)
    }

    async fn fetch_release(&self, release_id: ReleaseId) -> Option<Release> {
        match self.metadata.release_by_id(release_id).await {
            Ok(release) => Some(release),
            Err(err) => {
                warn!(
                    target: "resolution",
                    release_id = %release_id,
                    error = %err,
                    "failed to fetch release; skipping pairing"
                );
                None
            }
        }
    }

    fn matches_at(&self, release: &Release, position: u32, candidate: &CandidateTrack) -> bool {
        match self.position_match {
            PositionMatch::RecordingId => release.has_recording_at(position, candidate.id),
            PositionMatch::Title => release.has_title_at(position, &candidate.title),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        candidate, observation, recording_id, release, release_id, FakeMetadataStore,
    };

    fn resolver(store: FakeMetadataStore) -> ReleaseResolver {
        ReleaseResolver::new(Arc::new(store), PositionMatch::RecordingId)
    }

    /// R1 holds A, B, C in order. R2 holds A, C, B, so it breaks at position 2.
    fn three_track_store() -> FakeMetadataStore {
        FakeMetadataStore::new()
            .with_release(release(
                release_id(1),
                "Original",
                &[(recording_id(10), "A"), (recording_id(11), "B"), (recording_id(12), "C")],
            ))
            .with_release(release(
                release_id(2),
                "Reordered",
                &[(recording_id(10), "A"), (recording_id(12), "C"), (recording_id(11), "B")],
            ))
    }

    fn three_track_observations() -> Vec<TrackObservation> {
        let both = [release_id(1), release_id(2)];
        vec![
            observation(1, vec![candidate(recording_id(10), "A", &both)]),
            observation(2, vec![candidate(recording_id(11), "B", &both)]),
            observation(3, vec![candidate(recording_id(12), "C", &both)]),
        ]
    }

    #[tokio::test]
    async fn keeps_release_matching_every_position() {
        let resolver = resolver(three_track_store());

        let result = resolver.resolve(&three_track_observations()).await;

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].release_id, release_id(1));
        assert_eq!(result[0].consecutive_match_count(), 3);
    }

    #[tokio::test]
    async fn track_without_candidates_breaks_every_chain() {
        let resolver = resolver(three_track_store());
        let mut observations = three_track_observations();
        observations[1].candidates.clear();

        assert!(resolver.resolve(&observations).await.is_empty());
    }

    #[tokio::test]
    async fn missed_position_is_never_recovered() {
        // R2 matches positions 1 and 3 but not 2.
        let store = three_track_store();
        let both = [release_id(1), release_id(2)];
        let observations = vec![
            observation(1, vec![candidate(recording_id(10), "A", &both)]),
            observation(
                2,
                vec![
                    candidate(recording_id(11), "B", &both),
                    candidate(recording_id(99), "X", &[release_id(2)]),
                ],
            ),
            observation(3, vec![candidate(recording_id(11), "B", &both)]),
        ];

        let result = resolver(store).resolve(&observations).await;

        assert!(result.iter().all(|h| h.release_id != release_id(2)));
        // R1 has B at 2, not at 3, so it is dropped too.
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn release_with_different_track_count_is_discarded() {
        let store = FakeMetadataStore::new()
            .with_release(release(
                release_id(1),
                "Single",
                &[(recording_id(10), "A")],
            ))
            .with_release(release(
                release_id(2),
                "Deluxe",
                &[(recording_id(10), "A"), (recording_id(11), "B"), (recording_id(12), "C")],
            ));
        let observations = vec![
            observation(1, vec![candidate(recording_id(10), "A", &[release_id(1), release_id(2)])]),
            observation(2, vec![candidate(recording_id(11), "B", &[release_id(2)])]),
        ];

        assert!(resolver(store).resolve(&observations).await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_candidates_confirm_position_once() {
        let store = FakeMetadataStore::new().with_release(release(
            release_id(1),
            "Album",
            &[(recording_id(10), "A"), (recording_id(11), "B")],
        ));
        let same = candidate(recording_id(10), "A", &[release_id(1)]);
        let observations = vec![
            observation(1, vec![same.clone(), same]),
            observation(2, vec![candidate(recording_id(11), "B", &[release_id(1)])]),
        ];

        let result = resolver(store).resolve(&observations).await;

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].consecutive_match_count(), 2);
        assert_eq!(result[0].support(), 3);
    }

    #[tokio::test]
    async fn second_candidate_at_same_position_adds_support() {
        // Two recordings of the same song both sit on position 2 of R1's
        // track list under title matching.
        let store = FakeMetadataStore::new().with_release(release(
            release_id(1),
            "Album",
            &[(recording_id(10), "A"), (recording_id(11), "B")],
        ));
        let observations = vec![
            observation(1, vec![candidate(recording_id(10), "A", &[release_id(1)])]),
            observation(
                2,
                vec![
                    candidate(recording_id(11), "B", &[release_id(1)]),
                    candidate(recording_id(21), "b", &[release_id(1)]),
                ],
            ),
        ];

        let resolver = ReleaseResolver::new(Arc::new(store), PositionMatch::Title);
        let result = resolver.resolve(&observations).await;

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].support(), 3);
    }

    #[tokio::test]
    async fn title_mode_matches_normalized_titles() {
        // The release lists a different recording of the same songs.
        let store = FakeMetadataStore::new().with_release(release(
            release_id(1),
            "Live",
            &[(recording_id(50), "Intro"), (recording_id(51), "Café")],
        ));
        let observations = vec![
            observation(1, vec![candidate(recording_id(10), "INTRO", &[release_id(1)])]),
            observation(2, vec![candidate(recording_id(11), "cafe\u{301}", &[release_id(1)])]),
        ];

        let by_id = ReleaseResolver::new(
            Arc::new(store),
            PositionMatch::RecordingId,
        );
        assert!(by_id.resolve(&observations).await.is_empty());

        let store = FakeMetadataStore::new().with_release(release(
            release_id(1),
            "Live",
            &[(recording_id(50), "Intro"), (recording_id(51), "Café")],
        ));
        let by_title = ReleaseResolver::new(Arc::new(store), PositionMatch::Title);
        let result = by_title.resolve(&observations).await;
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].release_id, release_id(1));
    }

    #[tokio::test]
    async fn empty_input_yields_no_hypotheses() {
        let store = Arc::new(three_track_store());
        let resolver = ReleaseResolver::new(store.clone(), PositionMatch::RecordingId);

        assert!(resolver.resolve(&[]).await.is_empty());
        assert_eq!(store.release_calls(), 0);
    }

    #[tokio::test]
    async fn unfetchable_release_is_skipped() {
        let store = three_track_store();
        let observations = vec![observation(
            1,
            vec![candidate(recording_id(10), "A", &[release_id(404), release_id(3)])],
        )];
        let store = store.with_release(release(release_id(3), "Single", &[(recording_id(10), "A")]));

        let result = resolver(store).resolve(&observations).await;

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].release_id, release_id(3));
    }

    #[tokio::test]
    async fn stops_fetching_once_every_chain_is_broken() {
        let store = Arc::new(three_track_store());
        let resolver = ReleaseResolver::new(store.clone(), PositionMatch::RecordingId);
        let both = [release_id(1), release_id(2)];
        let observations = vec![
            observation(1, vec![candidate(recording_id(10), "A", &both)]),
            observation(2, vec![]),
            observation(3, vec![candidate(recording_id(12), "C", &both)]),
        ];

        assert!(resolver.resolve(&observations).await.is_empty());
        assert_eq!(store.release_calls(), 2);
    }

    #[tokio::test]
    async fn ranks_by_support_then_release_id() {
        let tracks = [(recording_id(10), "A"), (recording_id(11), "B")];
        let store = FakeMetadataStore::new()
            .with_release(release(release_id(3), "Reissue", &tracks))
            .with_release(release(release_id(2), "Original", &tracks))
            .with_release(release(release_id(1), "Promo", &tracks));
        let all = [release_id(3), release_id(2), release_id(1)];
        let observations = vec![
            observation(
                1,
                vec![
                    candidate(recording_id(10), "A", &all),
                    candidate(recording_id(10), "A", &[release_id(3)]),
                ],
            ),
            observation(2, vec![candidate(recording_id(11), "B", &all)]),
        ];

        let result = resolver(store).resolve(&observations).await;

        let ranked: Vec<_> = result.iter().map(|h| h.release_id).collect();
        assert_eq!(ranked, vec![release_id(3), release_id(1), release_id(2)]);
    }

    #[tokio::test]
    async fn short_release_offered_late_is_excluded() {
        // R1 has three tracks matching in order. R2 has two tracks and only
        // appears among the last track's candidates.
        let store = FakeMetadataStore::new()
            .with_release(release(
                release_id(1),
                "Album",
                &[(recording_id(10), "A"), (recording_id(11), "B"), (recording_id(12), "C")],
            ))
            .with_release(release(
                release_id(2),
                "Single",
                &[(recording_id(12), "C"), (recording_id(13), "D")],
            ));
        let observations = vec![
            observation(1, vec![candidate(recording_id(10), "A", &[release_id(1)])]),
            observation(2, vec![candidate(recording_id(11), "B", &[release_id(1)])]),
            observation(
                3,
                vec![candidate(recording_id(12), "C", &[release_id(1), release_id(2)])],
            ),
        ];

        let result = resolver(store).resolve(&observations).await;

        let ids: Vec<_> = result.iter().map(|h| h.release_id).collect();
        assert_eq!(ids, vec![release_id(1)]);
        assert_eq!(result[0].consecutive_match_count(), 3);
    }

    #[tokio::test]
    async fn repeated_recording_confirms_each_of_its_positions() {
        let store = FakeMetadataStore::new().with_release(release(
            release_id(1),
            "With Reprise",
            &[(recording_id(10), "X"), (recording_id(11), "Y"), (recording_id(10), "X")],
        ));
        let observations = vec![
            observation(1, vec![candidate(recording_id(10), "X", &[release_id(1)])]),
            observation(2, vec![candidate(recording_id(11), "Y", &[release_id(1)])]),
            observation(3, vec![candidate(recording_id(10), "X", &[release_id(1)])]),
        ];

        let result = resolver(store).resolve(&observations).await;

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].consecutive_match_count(), 3);
    }

    #[tokio::test]
    async fn repeated_title_confirms_each_of_its_positions() {
        let store = FakeMetadataStore::new().with_release(release(
            release_id(1),
            "Live",
            &[(recording_id(50), "Intro"), (recording_id(51), "Song"), (recording_id(52), "Intro")],
        ));
        let observations = vec![
            observation(1, vec![candidate(recording_id(10), "Intro", &[release_id(1)])]),
            observation(2, vec![candidate(recording_id(11), "Song", &[release_id(1)])]),
            observation(3, vec![candidate(recording_id(12), "intro", &[release_id(1)])]),
        ];

        let resolver = ReleaseResolver::new(Arc::new(store), PositionMatch::Title);
        let result = resolver.resolve(&observations).await;

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].release_id, release_id(1));
    }
}
