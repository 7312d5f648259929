//! Hand-assembled byte streams for integration tests.

#![allow(dead_code)]

/// Builds a binary asset stream token by token.
pub struct Stream {
    bytes: Vec<u8>,
}

impl Stream {
    pub fn new() -> Self {
        Self { bytes: b"@@b@".to_vec() }
    }

    pub fn object(mut self, depth: usize, name: &str) -> Self {
        self.bytes.extend(std::iter::repeat(b'[').take(depth));
        self.bytes.extend_from_slice(name.as_bytes());
        self.bytes.push(0);
        self
    }

    fn prop_header(&mut self, name: &str, tag: u8, count: i32) {
        self.bytes.push(b'!');
        self.bytes.push(name.len() as u8);
        self.bytes.extend_from_slice(name.as_bytes());
        self.bytes.push(tag);
        self.bytes.extend_from_slice(&count.to_le_bytes());
    }

    pub fn ints(mut self, name: &str, values: &[i32]) -> Self {
        self.prop_header(name, b'i', values.len() as i32);
        for v in values {
            self.bytes.extend_from_slice(&v.to_le_bytes());
        }
        self
    }

    pub fn floats(mut self, name: &str, values: &[f32]) -> Self {
        self.prop_header(name, b'f', values.len() as i32);
        for v in values {
            self.bytes.extend_from_slice(&v.to_le_bytes());
        }
        self
    }

    /// String property with the conventional NUL terminator counted in its length.
    pub fn string(mut self, name: &str, value: &str) -> Self {
        self.prop_header(name, b's', 1);
        self.bytes.extend_from_slice(&(value.len() as i32 + 1).to_le_bytes());
        self.bytes.extend_from_slice(value.as_bytes());
        self.bytes.push(0);
        self
    }

    pub fn raw(mut self, data: &[u8]) -> Self {
        self.bytes.extend_from_slice(data);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

/// Identity inverse bind transform, 12 floats.
pub const IDENTITY_TX: [f32; 12] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];

/// A skinned quad with a two-bone skeleton and one locator.
pub fn skinned_quad() -> Vec<u8> {
    Stream::new()
        .ints("pdxasset", &[1, 0])
        .object(1, "object")
        .floats("lodperc", &[0.5, 0.25])
        .object(2, "quad_lod0")
        .object(3, "mesh")
        .floats("p", &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0])
        .floats("n", &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0])
        .floats("u0", &[0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0])
        .ints("tri", &[0, 1, 2, 0, 2, 3])
        .object(4, "aabb")
        .floats("min", &[0.0, 0.0, 0.0])
        .floats("max", &[1.0, 1.0, 0.0])
        .object(4, "material")
        .string("shader", "PdxMeshStandardSkinned")
        .string("diff", "quad_diffuse.dds")
        .string("n", "quad_normal.dds")
        .object(4, "skin")
        .ints("bones", &[2])
        .ints("ix", &[0, -1, 0, 1, 1, -1, 1, 0])
        .floats("w", &[1.0, 0.0, 0.5, 0.5, 1.0, 0.0, 0.75, 0.25])
        .object(3, "skeleton")
        .object(4, "Root")
        .ints("ix", &[0])
        .floats("tx", &IDENTITY_TX)
        .object(4, "Tip")
        .ints("ix", &[1])
        .ints("pa", &[0])
        .floats("tx", &IDENTITY_TX)
        .object(1, "locator")
        .object(2, "attach_top")
        .floats("p", &[0.5, 1.0, 0.0])
        .floats("q", &[0.0, 0.0, 0.0, 1.0])
        .string("pa", "Tip")
        .build()
}
