#[cfg(test)]
mod tests {
    use crate::line_matching::{
        Direction, LineFilter, LineRegistry, MergeOutcome, Relation, RouteMatchError, SkipReason,
        TraversalKey,
    };
    use crate::railnet_formats::{CandidateRoute, CargoLabel, StationId, Stop, parse_cargo_label};

    fn label(text: &str) -> CargoLabel {
        parse_cargo_label(text).unwrap()
    }

    fn route(id: u32, stations: &[StationId], cargo: &[&str]) -> CandidateRoute {
        let labels: Vec<CargoLabel> = cargo.iter().map(|c| label(c)).collect();
        CandidateRoute::new(id, stations.iter().map(|&s| Stop::halting(s)).collect())
            .with_cargo(&labels)
    }

    fn submit_all(registry: &mut LineRegistry, routes: &[CandidateRoute]) {
        for candidate in routes {
            registry.submit(candidate).unwrap();
        }
    }

    #[test]
    fn test_new_cycle_is_registered() {
        let mut registry = LineRegistry::new();
        let outcome = registry.submit(&route(10, &[1, 2, 3], &["MAIL"])).unwrap();
        assert_eq!(outcome, MergeOutcome::Registered(0));

        let line = registry.line(0).unwrap();
        assert!(line.is_cycle);
        assert!(!line.is_bicycle);
        assert_eq!(line.cargo.len(), 1);
        let mail = line.cargo[&label("MAIL")];
        assert_eq!(mail.slice, 1);
        assert!(mail.forward);
        assert!(!mail.backward);
        assert_eq!(line.next_slice(), 2);
    }

    #[test]
    fn test_same_route_folds_new_cargo() {
        let mut registry = LineRegistry::new();
        registry.submit(&route(10, &[1, 2, 3], &["MAIL"])).unwrap();
        let outcome = registry.submit(&route(11, &[1, 2, 3], &["GOOD"])).unwrap();

        assert_eq!(outcome, MergeOutcome::MergedForward { line: 0, slice: 2 });
        assert_eq!(registry.len(), 1);
        let line = registry.line(0).unwrap();
        assert_eq!(line.cargo[&label("MAIL")].slice, 1);
        assert_eq!(line.cargo[&label("GOOD")].slice, 2);

        // the index sees the merged cargo
        let info = registry.index().traversal(TraversalKey::forward(0)).unwrap();
        assert_eq!(info.cargo.len(), 2);
    }

    #[test]
    fn test_identical_submission_is_idempotent() {
        let mut registry = LineRegistry::new();
        let candidate = route(10, &[4, 5, 6, 7], &["PASS"]);
        registry.submit(&candidate).unwrap();
        let outcome = registry.submit(&candidate).unwrap();

        assert_eq!(outcome, MergeOutcome::MergedForward { line: 0, slice: 2 });
        assert_eq!(registry.len(), 1);
        // slices add up when a label is merged again
        assert_eq!(registry.line(0).unwrap().cargo[&label("PASS")].slice, 3);
    }

    #[test]
    fn test_rotated_route_is_the_same_line() {
        let mut registry = LineRegistry::new();
        registry.submit(&route(10, &[1, 2, 3, 4], &["PASS"])).unwrap();
        let outcome = registry.submit(&route(11, &[3, 4, 1, 2], &["PASS"])).unwrap();
        assert!(matches!(outcome, MergeOutcome::MergedForward { line: 0, .. }));
    }

    #[test]
    fn test_reversed_route_makes_a_bicycle() {
        let mut registry = LineRegistry::new();
        registry.submit(&route(10, &[1, 2, 3], &["MAIL"])).unwrap();
        let outcome = registry.submit(&route(12, &[3, 2, 1], &["PASS"])).unwrap();

        assert_eq!(outcome, MergeOutcome::MergedReverse { line: 0, slice: 2 });
        let line = registry.line(0).unwrap();
        assert_eq!(line.reverse_id, Some(12));
        assert_eq!(line.identity(Direction::Backward), Some(12));
        assert!(line.is_bicycle);
        assert!(!line.is_cycle);

        let pass = line.cargo[&label("PASS")];
        assert!(pass.backward);
        assert!(!pass.forward);
        assert!(registry.index().contains(TraversalKey::backward(0)));
        assert_eq!(
            registry.index().traversal(TraversalKey::backward(0)).unwrap().cargo,
            line.directional_cargo(Direction::Backward)
        );
    }

    #[test]
    fn test_second_reverse_unit_conflicts() {
        let mut registry = LineRegistry::new();
        submit_all(
            &mut registry,
            &[route(10, &[1, 2, 3], &["MAIL"]), route(12, &[3, 2, 1], &["PASS"])],
        );

        let err = registry.submit(&route(13, &[2, 1, 3], &["PASS"])).unwrap_err();
        assert_eq!(
            err,
            RouteMatchError::ConflictingReverse {
                line: 10,
                existing: 12,
                candidate: 13,
            }
        );
    }

    #[test]
    fn test_shuttle_reversed_folds_forward() {
        let mut registry = LineRegistry::new();
        registry.submit(&route(10, &[1, 2], &["PASS"])).unwrap();
        let outcome = registry.submit(&route(11, &[2, 1], &["PASS"])).unwrap();

        assert_eq!(outcome, MergeOutcome::MergedForward { line: 0, slice: 2 });
        assert_eq!(registry.line(0).unwrap().reverse_id, None);
    }

    #[test]
    fn test_two_same_lines_are_ambiguous() {
        let mut registry = LineRegistry::new();
        submit_all(
            &mut registry,
            &[route(20, &[1, 2, 3, 4], &["PASS"]), route(21, &[1, 3, 5, 6], &["PASS"])],
        );
        assert_eq!(registry.len(), 2);

        let candidate = CandidateRoute::new(
            22,
            vec![Stop::halting(1), Stop::halting(3), Stop::passing(7), Stop::passing(8)],
        );
        let err = registry.submit(&candidate).unwrap_err();
        assert_eq!(
            err,
            RouteMatchError::AmbiguousSameMatch {
                candidate: 22,
                first: 20,
                second: 21,
            }
        );
    }

    #[test]
    fn test_unusable_candidates_are_skipped() {
        let mut registry = LineRegistry::new();

        let mut unresolved = route(30, &[1, 2, 3], &["PASS"]);
        unresolved.path_found = false;
        assert_eq!(
            registry.submit(&unresolved).unwrap(),
            MergeOutcome::Skipped(SkipReason::PathNotFound)
        );

        assert_eq!(
            registry.submit(&route(31, &[], &["PASS"])).unwrap(),
            MergeOutcome::Skipped(SkipReason::NoStops)
        );

        let passing = CandidateRoute::new(32, vec![Stop::passing(1), Stop::passing(2)]);
        assert_eq!(
            registry.submit(&passing).unwrap(),
            MergeOutcome::Skipped(SkipReason::NoHaltingStops)
        );

        assert!(registry.is_empty());
        assert_eq!(registry.index().station_count(), 0);
    }

    #[test]
    fn test_filter_hides_short_lines() {
        let mut registry = LineRegistry::new();
        submit_all(
            &mut registry,
            &[route(40, &[1, 2, 3, 2], &["MAIL"]), route(41, &[1, 2], &["MAIL"])],
        );
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.classify_line(1).unwrap().aggregate,
            Relation::SHORT
        );

        let hide_short = LineFilter {
            hide_short: true,
            hide_express: false,
        };
        assert_eq!(registry.visible_lines(hide_short).unwrap(), vec![0]);

        let hide_express = LineFilter {
            hide_short: false,
            hide_express: true,
        };
        assert_eq!(registry.visible_lines(hide_express).unwrap(), vec![0, 1]);
        // the view leaves the registry alone
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_filter_hides_express_lines() {
        let mut registry = LineRegistry::new();
        submit_all(
            &mut registry,
            &[route(50, &[1, 2, 3], &["PASS"]), route(51, &[1, 3], &["PASS"])],
        );

        assert_eq!(
            registry.classify_line(1).unwrap().aggregate,
            Relation::EXPRESS
        );
        let filter = LineFilter {
            hide_short: false,
            hide_express: true,
        };
        assert_eq!(registry.visible_lines(filter).unwrap(), vec![0]);
        assert_eq!(registry.visible_lines(LineFilter::default()).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_submission_order_only_permutes_ids() {
        let stopping = route(70, &[1, 2, 3], &["PASS"]);
        let express = route(71, &[1, 3], &["PASS"]);

        let mut in_order = LineRegistry::new();
        submit_all(&mut in_order, &[stopping.clone(), express.clone()]);
        let mut swapped = LineRegistry::new();
        submit_all(&mut swapped, &[express, stopping]);

        assert_eq!(in_order.len(), 2);
        assert_eq!(swapped.len(), 2);
        assert_eq!(in_order.line(0).unwrap().primary_id, 70);
        assert_eq!(swapped.line(1).unwrap().primary_id, 70);

        assert_eq!(in_order.classify_line(1).unwrap().aggregate, Relation::EXPRESS);
        assert!(in_order.classify_line(0).unwrap().aggregate.is_none());
        assert_eq!(swapped.classify_line(0).unwrap().aggregate, Relation::EXPRESS);
        assert!(swapped.classify_line(1).unwrap().aggregate.is_none());
    }

    #[test]
    fn test_first_submitted_direction_becomes_forward() {
        let outbound = route(80, &[1, 2, 3], &["PASS"]);
        let inbound = route(81, &[3, 2, 1], &["MAIL"]);

        let mut registry = LineRegistry::new();
        submit_all(&mut registry, &[outbound.clone(), inbound.clone()]);
        let line = registry.line(0).unwrap();
        assert_eq!((line.primary_id, line.reverse_id), (80, Some(81)));
        assert!(line.cargo[&label("PASS")].forward);
        assert!(line.cargo[&label("MAIL")].backward);

        let mut registry = LineRegistry::new();
        submit_all(&mut registry, &[inbound, outbound]);
        assert_eq!(registry.len(), 1);
        let line = registry.line(0).unwrap();
        assert_eq!((line.primary_id, line.reverse_id), (81, Some(80)));
        assert!(line.cargo[&label("MAIL")].forward);
        assert!(line.cargo[&label("PASS")].backward);
        assert!(line.is_bicycle);
    }

    #[test]
    fn test_express_needs_matching_cargo() {
        let mut registry = LineRegistry::new();
        submit_all(
            &mut registry,
            &[route(60, &[1, 2, 3], &["PASS"]), route(61, &[1, 3], &["COAL"])],
        );
        let filter = LineFilter {
            hide_short: true,
            hide_express: true,
        };
        assert_eq!(registry.visible_lines(filter).unwrap(), vec![0, 1]);
    }
}
