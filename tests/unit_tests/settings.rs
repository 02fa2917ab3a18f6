use spectral_hp::foundations::{BasisKey, BasisType, PointsKey, PointsType};
use spectral_hp::shape::ShapeType;
use spectral_hp::std_regions::{BasisFamily, ExpansionKey, ExpansionSettings};
use util::assert_panics;

fn key(basis_type: BasisType, num_modes: usize, num_points: usize, points_type: PointsType) -> BasisKey {
    BasisKey::new(basis_type, num_modes, PointsKey::new(num_points, points_type))
}

#[test]
fn settings_deserialize_with_defaults() {
    let settings: ExpansionSettings = serde_json::from_str("{}").unwrap();
    assert_eq!(settings, ExpansionSettings::default());
    assert_eq!(settings.num_modes, 4);
    assert_eq!(settings.basis_family, BasisFamily::Modified);
    assert_eq!(settings.quadrature_offset, 0);

    let settings: ExpansionSettings = serde_json::from_str(r#"{ "num_modes": 6 }"#).unwrap();
    assert_eq!(settings, ExpansionSettings::new(6, BasisFamily::Modified));

    let json = r#"{ "num_modes": 3, "basis_family": "Orthogonal", "quadrature_offset": 2 }"#;
    let settings: ExpansionSettings = serde_json::from_str(json).unwrap();
    assert_eq!(
        settings,
        ExpansionSettings::new(3, BasisFamily::Orthogonal).with_quadrature_offset(2)
    );
}

#[test]
fn settings_and_keys_survive_serialization() {
    let settings = ExpansionSettings::new(5, BasisFamily::NodalFekete).with_quadrature_offset(1);
    let json = serde_json::to_string(&settings).unwrap();
    let restored: ExpansionSettings = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, settings);

    let expansion_key = settings.expansion_key(ShapeType::Triangle);
    let json = serde_json::to_string(&expansion_key).unwrap();
    let restored: ExpansionKey = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, expansion_key);
    assert_eq!(restored.nodal_points(), Some(PointsKey::new(5, PointsType::NodalTriFekete)));
}

#[test]
fn modified_keys_use_radau_points_in_collapsed_directions() {
    let settings = ExpansionSettings::new(4, BasisFamily::Modified);
    assert_eq!(
        settings.basis_keys(ShapeType::Triangle),
        vec![
            key(BasisType::ModifiedA, 4, 5, PointsType::GaussLobattoLegendre),
            key(BasisType::ModifiedB, 4, 4, PointsType::GaussRadauMAlpha1Beta0),
        ]
    );
    assert_eq!(
        settings.basis_keys(ShapeType::Tetrahedron)[2],
        key(BasisType::ModifiedC, 4, 4, PointsType::GaussRadauMAlpha2Beta0)
    );
    assert_eq!(
        settings.basis_keys(ShapeType::Prism),
        vec![
            key(BasisType::ModifiedA, 4, 5, PointsType::GaussLobattoLegendre),
            key(BasisType::ModifiedA, 4, 5, PointsType::GaussLobattoLegendre),
            key(BasisType::ModifiedB, 4, 4, PointsType::GaussRadauMAlpha1Beta0),
        ]
    );

    let offset = settings.with_quadrature_offset(2).basis_keys(ShapeType::Triangle);
    assert_eq!(offset[0].num_points(), 7);
    assert_eq!(offset[1].num_points(), 6);
}

#[test]
fn pyramids_always_use_orthogonal_bases() {
    for family in [BasisFamily::Modified, BasisFamily::Orthogonal, BasisFamily::NodalFekete] {
        let keys = ExpansionSettings::new(3, family).basis_keys(ShapeType::Pyramid);
        let types: Vec<BasisType> = keys.iter().map(BasisKey::basis_type).collect();
        assert_eq!(types, vec![BasisType::OrthoA, BasisType::OrthoA, BasisType::OrthoC]);
    }
}

#[test]
fn lagrange_family_is_collocated_on_tensor_shapes() {
    let settings = ExpansionSettings::new(4, BasisFamily::GllLagrange);
    for shape in [ShapeType::Segment, ShapeType::Quadrilateral, ShapeType::Hexahedron] {
        for basis_key in settings.basis_keys(shape) {
            assert_eq!(basis_key, key(BasisType::GllLagrange, 4, 4, PointsType::GaussLobattoLegendre));
            assert!(basis_key.collocation());
        }
    }
    assert_panics!(settings.basis_keys(ShapeType::Triangle));
    assert_panics!(settings.basis_keys(ShapeType::Prism));
}

#[test]
fn fekete_family_falls_back_to_modified_bases() {
    let settings = ExpansionSettings::new(4, BasisFamily::NodalFekete);
    let triangle = settings.expansion_key(ShapeType::Triangle);
    assert!(triangle.nodal_points().is_some());
    assert_eq!(triangle.basis_keys()[0].basis_type(), BasisType::OrthoA);

    let quad = settings.expansion_key(ShapeType::Quadrilateral);
    assert_eq!(quad.nodal_points(), None);
    assert_eq!(quad, ExpansionSettings::new(4, BasisFamily::Modified).expansion_key(ShapeType::Quadrilateral));
}

#[test]
fn zero_modes_are_rejected() {
    assert_panics!(ExpansionSettings::new(0, BasisFamily::Modified).basis_keys(ShapeType::Segment));
}
