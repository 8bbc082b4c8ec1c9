//! Priority and gamification scoring tables.
//!
//! Pure, total functions: unknown severity/type strings fall back to their
//! default weights instead of failing, and every non-negative point total maps
//! to exactly one level name.

/// Named level tiers over cumulative points. Ranges are inclusive and
/// contiguous; the last tier is unbounded.
pub const USER_LEVELS: [(&str, i32, i32); 5] = [
    ("Nuevo Ciudadano", 0, 49),
    ("Ciudadano Activo", 50, 199),
    ("Eco-Guerrero", 200, 499),
    ("Guardián Verde", 500, 999),
    ("Héroe Ambiental", 1000, i32::MAX),
];

/// Point values per rewarded action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointAction {
    CreateReport,
    ReportVerified,
    CommentOnReport,
    LikeReport,
    VerifyCollectionPoint,
    ShareApp,
    CompleteProfile,
}

impl PointAction {
    pub fn value(&self) -> i32 {
        match self {
            PointAction::CreateReport => 10,
            PointAction::ReportVerified => 20,
            PointAction::CommentOnReport => 2,
            PointAction::LikeReport => 1,
            PointAction::VerifyCollectionPoint => 5,
            PointAction::ShareApp => 15,
            PointAction::CompleteProfile => 5,
        }
    }

    /// Log label, also used as the advisory `reason` for point grants.
    pub fn reason(&self) -> &str {
        match self {
            PointAction::CreateReport => "Reporte creado",
            PointAction::ReportVerified => "Reporte verificado",
            PointAction::CommentOnReport => "Comentario en reporte",
            PointAction::LikeReport => "Like en reporte",
            PointAction::VerifyCollectionPoint => "Punto de acopio verificado",
            PointAction::ShareApp => "Aplicación compartida",
            PointAction::CompleteProfile => "Perfil completado",
        }
    }
}

fn severity_weight(severity: &str) -> i32 {
    match severity {
        "baja" => 1,
        "media" => 2,
        "alta" => 3,
        "critica" => 4,
        _ => 2,
    }
}

fn type_weight(report_type: &str) -> i32 {
    match report_type {
        "acumulacion" => 2,
        "contenedor_lleno" => 1,
        "contenedor_danado" => 2,
        "vertedero_ilegal" => 3,
        "otro" => 1,
        _ => 1,
    }
}

/// Derive a report's priority from its severity and type.
///
/// `min(5, ceil((severity_weight + type_weight) / 2))`, always in [1, 5].
/// Recomputed whenever severity or type changes; never caller-supplied.
pub fn compute_priority(severity: &str, report_type: &str) -> i32 {
    let combined = severity_weight(severity) + type_weight(report_type);
    // integer ceil of combined / 2
    let priority = (combined + 1) / 2;
    priority.min(5)
}

/// Level name for a cumulative point total. Total over all non-negative
/// inputs; negative inputs clamp into the first tier.
pub fn level_for_points(points: i32) -> &'static str {
    for (name, min, max) in USER_LEVELS {
        if points >= min && points <= max {
            return name;
        }
    }
    USER_LEVELS[0].0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEVERITIES: [&str; 4] = ["baja", "media", "alta", "critica"];
    const TYPES: [&str; 5] = [
        "acumulacion",
        "contenedor_lleno",
        "contenedor_danado",
        "vertedero_ilegal",
        "otro",
    ];

    #[test]
    fn priority_in_range_for_all_known_pairs() {
        for severity in SEVERITIES {
            for report_type in TYPES {
                let p = compute_priority(severity, report_type);
                assert!((1..=5).contains(&p), "{severity}/{report_type} -> {p}");
            }
        }
    }

    #[test]
    fn priority_worked_examples() {
        // critica(4) + vertedero_ilegal(3) -> ceil(7/2) = 4
        assert_eq!(compute_priority("critica", "vertedero_ilegal"), 4);
        // baja(1) + contenedor_lleno(1) -> ceil(2/2) = 1
        assert_eq!(compute_priority("baja", "contenedor_lleno"), 1);
        // critica(4) + acumulacion(2) -> ceil(6/2) = 3
        assert_eq!(compute_priority("critica", "acumulacion"), 3);
    }

    #[test]
    fn unknown_enum_values_default_instead_of_failing() {
        // unknown severity -> media(2), unknown type -> 1: ceil(3/2) = 2
        assert_eq!(compute_priority("radioactiva", "meteorito"), 2);
        assert_eq!(
            compute_priority("", "vertedero_ilegal"),
            compute_priority("media", "vertedero_ilegal")
        );
    }

    #[test]
    fn levels_partition_all_point_totals() {
        // Tiers are contiguous: each tier starts right after the previous max.
        for pair in USER_LEVELS.windows(2) {
            assert_eq!(pair[0].2 + 1, pair[1].1);
        }
        // Spot-check totality over a dense range plus the unbounded tail.
        for points in 0..=1100 {
            let name = level_for_points(points);
            assert!(USER_LEVELS.iter().any(|(n, _, _)| *n == name));
        }
        assert_eq!(level_for_points(i32::MAX), "Héroe Ambiental");
    }

    #[test]
    fn level_boundaries() {
        assert_eq!(level_for_points(0), "Nuevo Ciudadano");
        assert_eq!(level_for_points(49), "Nuevo Ciudadano");
        assert_eq!(level_for_points(50), "Ciudadano Activo");
        // 45 + 10 points for a new report crosses into the second tier
        assert_eq!(level_for_points(45 + PointAction::CreateReport.value()), "Ciudadano Activo");
        assert_eq!(level_for_points(999), "Guardián Verde");
        assert_eq!(level_for_points(1000), "Héroe Ambiental");
    }

    #[test]
    fn point_values_match_config() {
        assert_eq!(PointAction::CreateReport.value(), 10);
        assert_eq!(PointAction::ReportVerified.value(), 20);
        assert_eq!(PointAction::CommentOnReport.value(), 2);
        assert_eq!(PointAction::LikeReport.value(), 1);
    }
}
