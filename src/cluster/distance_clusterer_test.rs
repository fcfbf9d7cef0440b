#[cfg(test)]
mod tests {
    use crate::cluster::{
        Cluster, ClusterEntity, ClusterStrategy, DistanceClusterer, cluster_id, threshold_meters,
    };
    use crate::error::ClusterError;
    use crate::geometry::{FeaturePoint, GeoPoint, distance_meters};
    use crate::viewport::{Viewport, get_bounds_for_cluster_expansion};
    use quickcheck::{TestResult, quickcheck};

    fn point(id: &str, lat: f64, lon: f64) -> FeaturePoint<()> {
        FeaturePoint::new(id, GeoPoint::new(lon, lat), ())
    }

    fn szeged_pair() -> DistanceClusterer<()> {
        DistanceClusterer::new(vec![
            point("a", 46.2530, 20.1484),
            point("b", 46.2531, 20.1485),
        ])
    }

    /// Entities after following a tap on `cluster` to the camera target at `zoom`
    fn after_tap(
        clusterer: &DistanceClusterer<()>,
        cluster: &Cluster,
        zoom: u8,
        viewport: &Viewport,
    ) -> Vec<ClusterEntity<()>> {
        let target = get_bounds_for_cluster_expansion(cluster, zoom, viewport);
        ClusterStrategy::clusters(clusterer, &target)
    }

    #[test]
    fn test_threshold_steps() {
        assert_eq!(threshold_meters(1.0), 3000.0);
        assert_eq!(threshold_meters(0.2), 3000.0);
        assert_eq!(threshold_meters(0.15), 1500.0);
        assert_eq!(threshold_meters(0.004), 10.0);
        assert_eq!(threshold_meters(0.003), 1.0);
        assert_eq!(threshold_meters(0.0001), 1.0);

        let deltas = [
            2.0, 0.2, 0.1, 0.07, 0.05, 0.03, 0.02, 0.01, 0.007, 0.005, 0.004, 0.003, 0.001,
        ];
        for pair in deltas.windows(2) {
            assert!(threshold_meters(pair[0]) >= threshold_meters(pair[1]));
        }
    }

    #[test]
    fn test_coarse_zoom_merges_nearby_points() {
        let entities = szeged_pair().cluster(0.2);
        assert_eq!(entities.len(), 1);
        let ClusterEntity::Cluster(cluster) = &entities[0] else {
            panic!("expected a cluster, got {:?}", entities[0]);
        };
        assert_eq!(cluster.point_count, 2);
        assert_eq!(cluster.member_ids, vec!["a".to_string(), "b".to_string()]);
        assert!((cluster.coordinate.latitude - 46.25305).abs() < 1e-9);
        assert!((cluster.coordinate.longitude - 20.14845).abs() < 1e-9);
    }

    #[test]
    fn test_max_zoom_keeps_points_apart() {
        let entities = szeged_pair().cluster(0.003);
        assert_eq!(entities.len(), 2);
        assert!(entities.iter().all(|e| !e.is_cluster()));
    }

    #[test]
    fn test_coincident_points_always_merge() {
        let clusterer = DistanceClusterer::new(vec![
            point("a", 46.2530, 20.1484),
            point("b", 46.2530, 20.1484),
        ]);
        for delta in [5.0, 0.2, 0.01, 0.003, 0.00001] {
            let entities = clusterer.cluster(delta);
            assert_eq!(entities.len(), 1, "delta {delta}");
            assert_eq!(entities[0].point_count(), 2);
        }
    }

    #[test]
    fn test_ten_meter_tier_merges_close_pair() {
        // ~5 m apart: grouped by the 10 m tier, apart once only co-located points group
        let clusterer = DistanceClusterer::new(vec![
            point("a", 46.25300, 20.1484),
            point("b", 46.25304, 20.1484),
        ]);
        let points = clusterer.points();
        let apart = distance_meters(&points[0].geometry, &points[1].geometry);
        assert!((apart - 4.45).abs() < 0.1);

        let entities = clusterer.cluster(0.004);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].point_count(), 2);

        let entities = clusterer.cluster(0.003);
        assert_eq!(entities.len(), 2);
        assert!(entities.iter().all(|e| !e.is_cluster()));
    }

    #[test]
    fn test_min_points_keeps_small_groups_apart() {
        let clusterer = DistanceClusterer::new(vec![
            point("a", 46.2530, 20.1484),
            point("b", 46.2530, 20.1484),
            point("c", 47.4979, 19.0402),
            point("d", 47.4980, 19.0403),
            point("e", 47.4981, 19.0402),
        ])
        .with_min_points(3);
        assert_eq!(clusterer.min_points(), 3);

        let entities = clusterer.cluster(0.2);
        assert_eq!(entities.len(), 3);
        assert!(matches!(&entities[0], ClusterEntity::Point(p) if p.id == "a"));
        assert!(matches!(&entities[1], ClusterEntity::Point(p) if p.id == "b"));
        assert!(matches!(&entities[2], ClusterEntity::Cluster(c) if c.point_count == 3));

        // the default still groups pairs
        assert_eq!(szeged_pair().min_points(), 2);
        assert_eq!(szeged_pair().cluster(0.2).len(), 1);
    }

    #[test]
    fn test_input_order_and_lone_points() {
        let clusterer = DistanceClusterer::new(vec![
            point("far", 47.5, 19.04),
            point("a", 46.2530, 20.1484),
            point("b", 46.2531, 20.1485),
        ]);
        let entities = clusterer.cluster(0.2);
        assert_eq!(entities.len(), 2);
        assert!(matches!(&entities[0], ClusterEntity::Point(p) if p.id == "far"));
        assert_eq!(entities[1].point_count(), 2);
    }

    #[test]
    fn test_cluster_id_is_stable() {
        let first = szeged_pair().cluster(0.2);
        let second = szeged_pair().cluster(0.5);
        assert_eq!(first[0].as_cluster().unwrap().id, second[0].as_cluster().unwrap().id);
        assert_eq!(
            cluster_id(&["a".into(), "b".into()]),
            first[0].as_cluster().unwrap().id
        );
        assert_ne!(cluster_id(&["ab".into()]), cluster_id(&["a".into(), "b".into()]));
    }

    #[test]
    fn test_expansion_zoom() {
        let clusterer = szeged_pair();
        let viewport = Viewport::new(46.253, 20.1484, 0.2, 0.3);
        let entities = ClusterStrategy::clusters(&clusterer, &viewport);
        let cluster = entities[0].as_cluster().unwrap();

        let zoom = ClusterStrategy::expansion_zoom(&clusterer, cluster, &viewport).unwrap();
        assert_eq!(zoom, 16);

        // the camera target of the expansion zoom shows the pair apart
        assert_eq!(after_tap(&clusterer, cluster, zoom, &viewport).len(), 2);
        // one level above it they are still merged
        assert_eq!(after_tap(&clusterer, cluster, zoom - 1, &viewport).len(), 1);
    }

    #[test]
    fn test_expansion_zoom_with_uneven_view() {
        // ~2 km apart north-south, in a view whose span is not a zoom level's
        let clusterer = DistanceClusterer::new(vec![
            point("a", 46.0, 20.0),
            point("b", 46.018, 20.0),
        ]);
        let viewport = Viewport::new(46.009, 20.0, 0.3, 0.5);
        assert_eq!(viewport.zoom(), 9);
        let entities = ClusterStrategy::clusters(&clusterer, &viewport);
        assert_eq!(entities.len(), 1);
        let cluster = entities[0].as_cluster().unwrap();

        let zoom = clusterer.expansion_zoom(cluster, &viewport).unwrap();
        assert_eq!(zoom, 11);
        assert_eq!(after_tap(&clusterer, cluster, zoom, &viewport).len(), 2);
        assert_eq!(after_tap(&clusterer, cluster, zoom - 1, &viewport).len(), 1);
    }

    #[test]
    fn test_coincident_cluster_expands_to_max_zoom() {
        let clusterer = DistanceClusterer::new(vec![
            point("a", 46.2530, 20.1484),
            point("b", 46.2530, 20.1484),
        ]);
        let viewport = Viewport::new(46.253, 20.1484, 0.2, 0.3);
        let entities = clusterer.cluster(viewport.latitude_delta);
        let cluster = entities[0].as_cluster().unwrap();
        assert_eq!(clusterer.expansion_zoom(cluster, &viewport), Ok(20));
    }

    #[test]
    fn test_expansion_of_unknown_cluster() {
        let clusterer = szeged_pair();
        let viewport = Viewport::new(46.253, 20.1484, 0.2, 0.3);
        let other =
            DistanceClusterer::new(vec![point("x", 46.0, 20.0), point("y", 46.0, 20.0)]);
        let foreign = other.cluster(0.2);
        let cluster = foreign[0].as_cluster().unwrap();

        assert_eq!(
            clusterer.expansion_zoom(cluster, &viewport),
            Err(ClusterError::ClusterNotFound(cluster.id))
        );
    }

    #[test]
    fn test_strategy_filters_to_viewport() {
        let clusterer = DistanceClusterer::new(vec![
            point("a", 46.2530, 20.1484),
            point("tokyo", 35.68, 139.76),
        ]);
        let viewport = Viewport::new(46.253, 20.1484, 0.2, 0.3);
        let entities = ClusterStrategy::clusters(&clusterer, &viewport);
        assert_eq!(entities.len(), 1);
        assert!(matches!(&entities[0], ClusterEntity::Point(p) if p.id == "a"));
    }

    quickcheck! {
        fn prop_far_points_never_merge(offsets: Vec<(i16, i16)>, delta_step: u8) -> TestResult {
            if offsets.len() < 2 || offsets.len() > 40 {
                return TestResult::discard();
            }
            let deltas = [0.5, 0.15, 0.07, 0.03, 0.015, 0.007, 0.004, 0.002];
            let delta = deltas[delta_step as usize % deltas.len()];
            let threshold = threshold_meters(delta);
            let points: Vec<FeaturePoint<()>> = offsets
                .iter()
                .enumerate()
                .map(|(i, &(dx, dy))| {
                    point(&i.to_string(), 46.25 + dy as f64 * 1e-5, 20.15 + dx as f64 * 1e-5)
                })
                .collect();
            let by_id = |id: &str| points.iter().find(|p| p.id == id).map(|p| p.geometry);

            let entities = DistanceClusterer::new(points.clone()).cluster(delta);
            let total: usize = entities.iter().map(|e| e.point_count()).sum();
            if total != points.len() {
                return TestResult::failed();
            }
            for e in &entities {
                if let ClusterEntity::Cluster(c) = e {
                    for a in &c.member_ids {
                        for b in &c.member_ids {
                            let (Some(pa), Some(pb)) = (by_id(a), by_id(b)) else {
                                return TestResult::failed();
                            };
                            if distance_meters(&pa, &pb) > threshold {
                                return TestResult::failed();
                            }
                        }
                    }
                }
            }
            TestResult::passed()
        }
    }
}
