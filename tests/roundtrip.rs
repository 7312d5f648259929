//! Encode/decode round-trips at tree, model and file level.

mod common;

use common::{skinned_quad, Stream};
use pdx_mesh::anim::{AnimBone, AnimationTrack, Scale};
use pdx_mesh::asset::{Asset, Bone, Locator, LodSwitches, Material, Mesh, Skin};
use pdx_mesh::binary::{decode, encode, IArchive, OArchive, ReadOptions};
use pdx_mesh::util::{Error, Mat4, Quat, Vec2, Vec3, Vec4};
use pdx_mesh::{read_file, AssetFile, Tree};

use tempfile::{tempdir, NamedTempFile};

fn nested_tree() -> Tree {
    let mut tree = Tree::new();
    let root = tree.root();
    tree.push_property(root, "pdxasset", vec![1i32, 0]);
    let a = tree.add_child(root, "a");
    tree.push_property(a, "f", vec![f32::NAN, -0.0, 1.5e-9]);
    let b = tree.add_child(a, "b");
    tree.push_property(b, "s", "caf\u{e9}");
    tree.push_property(b, "empty", Vec::<i32>::new());
    let c = tree.add_child(b, "c");
    tree.push_property(c, "i", vec![i32::MIN, i32::MAX]);
    // Back up two levels after the deepest node.
    let d = tree.add_child(a, "d");
    tree.push_property(d, "s", "");
    tree.add_child(root, "e");
    tree
}

#[test]
fn test_tree_roundtrip() {
    let tree = nested_tree();
    let bytes = encode(&tree).unwrap();
    let back = decode(&bytes).unwrap();
    assert_eq!(back, tree);
    // Encoding is deterministic.
    assert_eq!(encode(&back).unwrap(), bytes);
}

fn edge_case_trees() -> Vec<(&'static str, Tree)> {
    let mut cases = Vec::new();

    let mut tree = Tree::new();
    let root = tree.root();
    let unnamed = tree.add_child(root, "");
    tree.push_property(unnamed, "", vec![7i32]);
    tree.add_child(unnamed, "");
    cases.push(("empty names", tree));

    let mut tree = Tree::new();
    let root = tree.root();
    tree.push_property(root, "s", "ends with nul\0");
    tree.push_property(root, "only_nul", "\0");
    tree.push_property(root, "empty", "");
    cases.push(("nul-terminated string values", tree));

    let mut tree = Tree::new();
    let root = tree.root();
    let mut deepest = root;
    for depth in 1..=6i32 {
        deepest = tree.add_child(deepest, format!("level{}", depth));
        tree.push_property(deepest, "d", vec![depth]);
    }
    // Back from depth 6 to depth 1, then to depth 2.
    let sibling = tree.add_child(root, "sibling");
    tree.add_child(sibling, "child");
    cases.push(("multi-level depth drop", tree));

    let mut tree = Tree::new();
    let root = tree.root();
    let long = "p".repeat(255);
    tree.push_property(root, long.as_str(), vec![1.0f32]);
    let node = tree.add_child(root, "after");
    tree.push_property(node, long, "x");
    cases.push(("255-byte property name", tree));

    let mut tree = Tree::new();
    let root = tree.root();
    tree.push_property(root, "nan", vec![f32::NAN, f32::INFINITY, -0.0]);
    tree.push_property(root, "ints", Vec::<i32>::new());
    tree.push_property(root, "floats", Vec::<f32>::new());
    cases.push(("special floats and empty arrays", tree));

    cases.push(("nested tree", nested_tree()));
    cases
}

#[test]
fn test_edge_case_roundtrips() {
    for (label, tree) in edge_case_trees() {
        let bytes = encode(&tree).unwrap_or_else(|e| panic!("{}: {}", label, e));
        let back = decode(&bytes).unwrap_or_else(|e| panic!("{}: {}", label, e));
        assert_eq!(back, tree, "{}", label);
        assert_eq!(encode(&back).unwrap(), bytes, "{}", label);
    }
}

#[test]
fn test_property_name_over_255_bytes_rejected() {
    let mut tree = Tree::new();
    let root = tree.root();
    tree.push_property(root, "p".repeat(256), vec![1i32]);
    assert!(matches!(encode(&tree), Err(Error::EncodeConstraintViolation(_))));
}

#[test]
fn test_canonical_stream_reencodes_identically() {
    let bytes = skinned_quad();
    let tree = decode(&bytes).unwrap();
    assert_eq!(encode(&tree).unwrap(), bytes);
}

#[test]
fn test_string_without_terminator_in_length() {
    // Length 3 with no NUL counted: still decodes to "abc".
    let mut raw = b"!\x01ss".to_vec();
    raw.extend_from_slice(&1i32.to_le_bytes());
    raw.extend_from_slice(&3i32.to_le_bytes());
    raw.extend_from_slice(b"abc");
    let bytes = Stream::new().raw(&raw).build();
    let tree = decode(&bytes).unwrap();
    assert_eq!(tree.node(tree.root()).property("s").and_then(|v| v.as_str()), Some("abc"));
}

fn full_asset() -> Asset {
    let mut mesh = Mesh::new("body");
    mesh.positions = Some(vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
    mesh.normals = Some(vec![Vec3::Z; 3]);
    mesh.tangents = Some(vec![Vec4::new(1.0, 0.0, 0.0, -1.0); 3]);
    mesh.uvs[0] = Some(vec![Vec2::ZERO, Vec2::X, Vec2::Y]);
    mesh.uvs[1] = Some(vec![Vec2::ONE; 3]);
    mesh.triangles = vec![0, 1, 2];
    mesh.bounding_sphere = Some([0.5, 0.5, 0.0, 0.75]);
    mesh.material = Some(
        Material::new("PdxMeshStandardSkinned")
            .with_texture("diff", "body_diffuse.dds")
            .with_texture("spec", "body_spec.dds")
            .with_texture("custom", "body_custom.dds"),
    );
    mesh.skin = Some(Skin::from_vertex_weights(&[vec![(0, 1.0)], vec![(0, 0.5), (1, 0.5)], vec![(1, 1.0)]]));
    mesh.bones = vec![
        Bone::new("Root", 0, None, Mat4::IDENTITY),
        Bone::new("Child", 1, Some(0), Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0))),
    ];

    let mut second = Mesh::new("body");
    second.material_index = 1;
    second.positions = Some(vec![Vec3::ONE]);
    second.material = Some(Material::new("PdxMeshAlphaBlend"));
    second.bones = mesh.bones.clone();

    let mut asset = Asset::new();
    asset.lod_switches = Some(LodSwitches::Distance(vec![10.0, 50.0]));
    asset.meshes = vec![mesh, second];
    asset.skeletons = vec![pdx_mesh::asset::Skeleton { name: "body".into(), bones: asset.meshes[0].bones.clone() }];
    asset.locators = vec![
        Locator::new("attach", Vec3::new(0.0, 2.0, 0.0), Quat::from_rotation_y(0.5)).with_parent("Child"),
        Locator {
            transform: Some(Mat4::from_scale(Vec3::new(1.0, 2.0, 3.0))),
            ..Locator::new("scaled", Vec3::ZERO, Quat::IDENTITY)
        },
    ];
    asset
}

#[test]
fn test_asset_roundtrip() {
    let mut asset = full_asset();
    let bytes = asset.to_bytes().unwrap();
    let decoded = Asset::from_bytes(&bytes).unwrap();
    assert!(decoded.is_clean(), "{:?}", decoded.warnings);

    // Bounding boxes are filled in on export.
    for mesh in asset.meshes.iter_mut() {
        mesh.aabb = mesh.compute_aabb();
    }
    assert_eq!(decoded.value, asset);
}

#[test]
fn test_decoded_asset_reexports_identically() {
    let asset = Asset::from_bytes(&skinned_quad()).unwrap().value;
    let bytes = asset.to_bytes().unwrap();
    let again = Asset::from_bytes(&bytes).unwrap().value;
    assert_eq!(again, asset);
    assert_eq!(again.to_bytes().unwrap(), bytes);
}

#[test]
fn test_export_rejects_invalid_skin() {
    let mut asset = full_asset();
    asset.meshes[0].skin.as_mut().unwrap().influence_count = 5;
    assert!(matches!(asset.to_bytes(), Err(Error::EncodeConstraintViolation(_))));

    let mut asset = full_asset();
    asset.meshes[0].skin.as_mut().unwrap().weights.pop();
    assert!(matches!(asset.to_bytes(), Err(Error::EncodeConstraintViolation(_))));

    let mut asset = full_asset();
    asset.meshes[0].skin.as_mut().unwrap().bone_indices[0] = 7;
    assert!(matches!(asset.to_bytes(), Err(Error::EncodeConstraintViolation(_))));
}

#[test]
fn test_export_rejects_conflicting_skeletons() {
    // Same shape name, different bone lists.
    let mut asset = full_asset();
    asset.meshes[1].bones = vec![Bone::new("Other", 0, None, Mat4::IDENTITY)];
    assert!(matches!(asset.to_bytes(), Err(Error::EncodeConstraintViolation(_))));

    // The shape's skeleton entry disagrees with its meshes.
    let mut asset = full_asset();
    asset.skeletons[0].bones.pop();
    assert!(matches!(asset.to_bytes(), Err(Error::EncodeConstraintViolation(_))));

    // A mesh without bones simply shares the shape's skeleton.
    let mut asset = full_asset();
    asset.meshes[1].bones.clear();
    assert!(asset.to_bytes().is_ok());
}

#[test]
fn test_write_and_read_file() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let asset = full_asset();
    let written = asset.write(temp.path()).unwrap();
    assert!(written > 0);

    for use_mmap in [true, false] {
        let options = ReadOptions { use_mmap, strict: true };
        let archive = IArchive::open_opts(temp.path(), options).unwrap();
        assert_eq!(archive.size(), written);
        let decoded = Asset::from_archive(&archive).unwrap();
        assert_eq!(decoded.value.source, temp.path().display().to_string());
        assert_eq!(decoded.value.meshes.len(), 2);
    }
}

#[test]
fn test_failed_export_writes_nothing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.mesh");
    let mut asset = full_asset();
    asset.locators[0].name = "x".repeat(80);
    assert!(asset.write(&path).is_err());
    assert!(!path.exists());
}

#[test]
fn test_oarchive_tree() {
    let temp = NamedTempFile::new().unwrap();
    let tree = nested_tree();
    OArchive::create(temp.path()).unwrap().write_tree(&tree).unwrap();
    let archive = IArchive::open(temp.path()).unwrap();
    assert_eq!(archive.tree(), &tree);
}

#[test]
fn test_missing_file() {
    let dir = tempdir().unwrap();
    let err = IArchive::open(dir.path().join("nope.mesh")).unwrap_err();
    assert!(matches!(err, Error::FileNotFound(_)));
}

#[test]
fn test_read_file_animation() {
    let mut track = AnimationTrack::new(30.0, 3);
    let mut bone = AnimBone::new("Root", Vec3::ZERO, Quat::IDENTITY, Scale::NonUniform(Vec3::ONE));
    bone.set_rotation_samples(&[Quat::IDENTITY, Quat::from_rotation_z(0.1), Quat::from_rotation_z(0.2)]);
    bone.set_scale_samples(&[1.0, 1.0, 1.0, 1.1, 1.1, 1.1, 1.2, 1.2, 1.2]);
    track.bones.push(bone);

    let dir = tempdir().unwrap();
    let path = dir.path().join("idle.anim");
    track.write(&path).unwrap();

    let decoded = read_file(&path, ReadOptions::strict()).unwrap();
    match decoded.value {
        AssetFile::Animation(read) => {
            assert_eq!(read.bones, track.bones);
            assert_eq!(read.frame_count, 3);
        }
        other => panic!("expected animation, got {}", other.kind()),
    }
}
