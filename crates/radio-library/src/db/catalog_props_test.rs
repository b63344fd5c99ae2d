//! Property-based tests for the catalog store and staleness policy.
//!
//! These cover invariants over arbitrary record sets: upsert idempotence,
//! the rescan threshold boundary and liveness filtering.

#[cfg(test)]
mod tests {
    use crate::cache::{exceeds_threshold, CacheStatus, CacheValidator};
    use crate::db::Catalog;
    use proptest::prelude::*;
    use radio_core::Track;
    use std::fs::{self, File};
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    /// Catalog plus a source folder holding one descriptor per title
    fn setup(titles: &[String]) -> (TempDir, Catalog, String, Vec<Track>) {
        let dir = tempdir().unwrap();
        let source = dir.path().join("Songs");
        fs::create_dir(&source).unwrap();
        let catalog = Catalog::new(dir.path().join("songs.db"));

        let tracks = titles
            .iter()
            .enumerate()
            .map(|(i, title)| {
                let descriptor = source.join(format!("{}.osu", i));
                File::create(&descriptor).unwrap();
                Track {
                    title: title.clone(),
                    artist: "Artist".to_string(),
                    mapper: "Mapper".to_string(),
                    audio_filename: "audio.mp3".to_string(),
                    descriptor_path: descriptor.to_string_lossy().to_string(),
                    folder_path: source.to_string_lossy().to_string(),
                    ..Default::default()
                }
            })
            .collect();

        (dir, catalog, source.to_string_lossy().to_string(), tracks)
    }

    fn ceil_30_percent(total: usize) -> usize {
        (total * 3).div_ceil(10)
    }

    // Strategy for distinct track titles
    fn titles_strategy(max: usize) -> impl Strategy<Value = Vec<String>> {
        prop::collection::hash_set("[a-z]{1,12}", 1..max).prop_map(|set| set.into_iter().collect::<Vec<_>>())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Saving the same set twice leaves the same rows as saving it once
        #[test]
        fn save_is_idempotent(titles in titles_strategy(20)) {
            let (_dir, catalog, source, tracks) = setup(&titles);

            prop_assert!(catalog.save(&source, &tracks));
            let once = catalog.load_all(&source);

            prop_assert!(catalog.save(&source, &tracks));
            let twice = catalog.load_all(&source);

            prop_assert_eq!(once.len(), tracks.len());
            prop_assert_eq!(once, twice);
        }

        /// Records sharing (title, artist, mapper) collapse to one row per folder
        #[test]
        fn duplicate_keys_collapse(titles in titles_strategy(10), copies in 2usize..4) {
            let (_dir, catalog, source, tracks) = setup(&titles);

            let repeated: Vec<Track> = (0..copies).flat_map(|_| tracks.clone()).collect();
            prop_assert!(catalog.save(&source, &repeated));
            prop_assert_eq!(catalog.load_all(&source).len(), titles.len());
        }

        /// Integer threshold agrees with the ceil(0.3 * total) boundary
        #[test]
        fn threshold_matches_ceiling(total in 1usize..5000) {
            let boundary = ceil_30_percent(total);
            prop_assert!(exceeds_threshold(boundary, total));
            if boundary > 1 {
                prop_assert!(!exceeds_threshold(boundary - 1, total));
            }
        }

        /// Validation flips from cleanup to rescan exactly at the boundary
        #[test]
        fn validator_threshold_boundary(total in 2usize..40) {
            let titles: Vec<String> = (0..total).map(|i| format!("t{}", i)).collect();
            let (_dir, catalog, source, tracks) = setup(&titles);
            prop_assert!(catalog.save(&source, &tracks));

            let boundary = ceil_30_percent(total);
            for t in &tracks[..boundary - 1] {
                fs::remove_file(&t.descriptor_path).unwrap();
            }

            let below = CacheValidator::new(&catalog).validate(&source);
            if boundary > 1 {
                prop_assert_eq!(below.status, CacheStatus::CleanupRecommended);
                prop_assert_eq!(below.missing.len(), boundary - 1);
            }

            fs::remove_file(&tracks[boundary - 1].descriptor_path).unwrap();
            let at = CacheValidator::new(&catalog).validate(&source);
            prop_assert_eq!(at.status, CacheStatus::RescanRequired);
            prop_assert_eq!(at.missing.len(), boundary);
        }

        /// load never returns a record whose descriptor was deleted
        #[test]
        fn load_filters_deleted(titles in titles_strategy(15), mask in prop::collection::vec(any::<bool>(), 15)) {
            let (_dir, catalog, source, tracks) = setup(&titles);
            prop_assert!(catalog.save(&source, &tracks));

            for (t, kill) in tracks.iter().zip(&mask) {
                if *kill {
                    fs::remove_file(&t.descriptor_path).unwrap();
                }
            }

            let loaded = catalog.load(&source).unwrap_or_default();
            prop_assert!(loaded.iter().all(|t| Path::new(&t.descriptor_path).exists()));
            let live = tracks.iter().zip(&mask).filter(|(_, kill)| !**kill).count();
            prop_assert_eq!(loaded.len(), live);
        }
    }
}
