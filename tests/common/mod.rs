#![allow(dead_code)]

pub const SKELETON: i32 = -1742448933;
pub const TEXTURE: i32 = -843079536;
pub const MESH_INFO: i32 = 1845060531;
pub const MATERIAL: i32 = -168275601;
pub const STREAM: i32 = 2056721529;

pub const DIFFUSE: i32 = -589273463;

const LABEL_SIZE: usize = 36;
const MESH_RECORD_FIELDS: usize = 36;

fn push_i32s(bytes: &mut Vec<u8>, values: &[i32]) {
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
}

pub fn u16_data(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn f32_data(values: &[[f32; 3]]) -> Vec<u8> {
    values
        .iter()
        .flatten()
        .flat_map(|v| v.to_le_bytes())
        .collect()
}

/// Streams and material used by one mesh-info record.
#[derive(Debug, Clone, Copy, Default)]
pub struct Draw {
    pub material: i32,
    pub index_stream: i32,
    pub position_stream: i32,
    pub skin_stream: i32,
    pub uv_stream: i32,
    pub index_start: i32,
    pub triangles: i32,
}

impl Draw {
    fn fields(&self) -> [i32; MESH_RECORD_FIELDS] {
        let mut fields = [0; MESH_RECORD_FIELDS];
        fields[3] = self.material;
        fields[11] = self.index_stream;
        fields[15] = self.position_stream;
        fields[19] = self.skin_stream;
        fields[23] = self.uv_stream;
        fields[29] = self.index_start;
        fields[30] = self.triangles;
        fields
    }
}

/// Lays out a container section by section.
#[derive(Debug, Default)]
pub struct ContainerBuilder {
    bytes: Vec<u8>,
    /// Where the offset table of the last mesh-info section starts.
    mesh_table: Option<usize>,
}

impl ContainerBuilder {
    pub fn new() -> ContainerBuilder {
        ContainerBuilder::default()
    }

    pub fn section(mut self, tag: i32, id: i32, body: &[u8]) -> ContainerBuilder {
        let length = (7 * 4 + LABEL_SIZE + body.len()) as i32;

        push_i32s(&mut self.bytes, &[tag, length, 0, 0]);
        push_i32s(&mut self.bytes, &[0, 0, 0, id, 0, 0, 0]);

        let mut label = [0u8; LABEL_SIZE];
        let name = format!("section_{}", id);
        label[..name.len()].copy_from_slice(name.as_bytes());
        self.bytes.extend_from_slice(&label);

        self.bytes.extend_from_slice(body);
        self
    }

    pub fn stream(self, id: i32, stride: i32, count: i32, data: &[u8]) -> ContainerBuilder {
        let mut body = Vec::new();
        let mut descriptor = [0; 32];
        descriptor[3] = stride;
        descriptor[4] = count;
        push_i32s(&mut body, &descriptor);
        body.extend_from_slice(data);

        self.section(STREAM, id, &body)
    }

    pub fn material(self, id: i32, diffuse: i32) -> ContainerBuilder {
        let mut body = Vec::new();
        push_i32s(&mut body, &[0, 0, 0, 0, 1, 0, 0, 0]);
        push_i32s(&mut body, &[DIFFUSE, 0, 0, 0, 0, 0, diffuse, 0]);

        self.section(MATERIAL, id, &body)
    }

    pub fn skeleton(self, id: i32, names: &[&str]) -> ContainerBuilder {
        let mut body = Vec::new();
        push_i32s(&mut body, &[0, names.len() as i32, 0, 0, 0, 0, 0, 0]);
        body.extend_from_slice(&[0; 160]);

        for name in names {
            let mut field = [0u8; 64];
            field[..name.len()].copy_from_slice(name.as_bytes());
            body.extend_from_slice(&field);
        }
        body.extend(std::iter::repeat_n(0u8, names.len() * 8));

        self.section(SKELETON, id, &body)
    }

    pub fn mesh_info(self, id: i32, draws: &[Draw]) -> ContainerBuilder {
        let count = draws.len() as i32;
        let record_size = (MESH_RECORD_FIELDS * 4) as i32;

        let mut body = Vec::new();
        push_i32s(&mut body, &[0; 15]);
        let mut header = [0; 17];
        header[1] = count;
        push_i32s(&mut body, &header);

        let table_in_body = body.len();

        // Records sit right after the table, each offset counted from its own slot.
        for m in 0..count {
            push_i32s(&mut body, &[(count - m) * 4 + m * record_size]);
        }
        for draw in draws {
            push_i32s(&mut body, &draw.fields());
        }

        let body_start = self.bytes.len() + 4 * 4 + 7 * 4 + LABEL_SIZE;
        let mut builder = self.section(MESH_INFO, id, &body);
        builder.mesh_table = Some(body_start + table_in_body);
        builder
    }

    /// Overwrites slot `m` of the last mesh-info offset table.
    pub fn with_slot(mut self, m: usize, offset: i32) -> ContainerBuilder {
        let table = self.mesh_table.expect("no mesh-info section yet");
        let at = table + m * 4;
        self.bytes[at..at + 4].copy_from_slice(&offset.to_le_bytes());
        self
    }

    pub fn texture(
        self,
        id: i32,
        codec: i32,
        size_code: i32,
        offset: i32,
        size: i32,
    ) -> ContainerBuilder {
        let mut fields = [0; 55];
        fields[1] = codec;
        fields[4] = size_code;
        fields[12] = offset;
        fields[13] = size;

        let mut body = Vec::new();
        push_i32s(&mut body, &fields);

        self.section(TEXTURE, id, &body)
    }

    pub fn padding(mut self, len: usize) -> ContainerBuilder {
        self.bytes.extend(std::iter::repeat_n(0u8, len));
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn mesh_table(&self) -> Option<usize> {
        self.mesh_table
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

pub const QUAD: [[f32; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 1.0, 0.0],
];

/// Index stream 10 and float position stream 20 describing a unit quad.
pub fn quad_streams(builder: ContainerBuilder) -> ContainerBuilder {
    builder
        .stream(10, 2, 6, &u16_data(&[0, 1, 2, 0, 2, 3]))
        .stream(20, 12, 4, &f32_data(&QUAD))
}

pub fn quad_draw() -> Draw {
    Draw {
        index_stream: 10,
        position_stream: 20,
        triangles: 2,
        ..Draw::default()
    }
}
