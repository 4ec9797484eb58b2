use serde::Serialize;
use std::fmt::{self, Display, Formatter};
use vtmem_layout::{FieldSummary, LayoutEngine, LayoutError, ObjectLayout};
use vtmem_types::{TypeDescriptor, TypeKind};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeCategory {
    Value,
    Identity,
    Array,
}

/// Layout of one type under a configuration, for printing.
#[derive(Clone, Debug, Serialize)]
pub struct LayoutReport {
    pub name: String,
    pub category: TypeCategory,
    pub config: String,
    pub header_size: usize,
    pub value_header_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stride: Option<usize>,
    pub flattened_array: bool,
}

impl LayoutReport {
    pub fn new(engine: &LayoutEngine, ty: &TypeDescriptor) -> Result<Self, LayoutError> {
        let category = match ty.kind {
            TypeKind::Value => TypeCategory::Value,
            TypeKind::Identity => TypeCategory::Identity,
            TypeKind::Array { .. } => TypeCategory::Array,
        };
        let mut report = Self {
            name: ty.name.clone(),
            category,
            config: engine.config().to_string(),
            header_size: 0,
            value_header_size: engine.value_header_size(Some(ty))?,
            data_size: None,
            instance_size: None,
            alignment: None,
            fields: vec![],
            element: None,
            stride: None,
            flattened_array: engine.is_flattened_array(Some(ty)),
        };
        match engine.object_layout(ty)? {
            ObjectLayout::Instance(layout) => {
                report.header_size = layout.header_size();
                report.data_size = Some(layout.data_size);
                report.instance_size = Some(layout.size);
                report.alignment = Some(layout.alignment);
                report.fields = layout.fields.iter().map(FieldSummary::from).collect();
            }
            ObjectLayout::Array(layout) => {
                report.header_size = layout.header.size;
                report.element = Some(engine.registry().get(layout.element)?.name.clone());
                report.stride = Some(layout.stride);
            }
        }
        Ok(report)
    }
}

impl Display for LayoutReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({:?}) under [{}]", self.name, self.category, self.config)?;
        writeln!(f, "  header:       {} bytes", self.header_size)?;
        writeln!(f, "  value header: {} bytes", self.value_header_size)?;
        if let (Some(data), Some(size), Some(align)) =
            (self.data_size, self.instance_size, self.alignment)
        {
            writeln!(f, "  data:         {} bytes, align {}", data, align)?;
            writeln!(f, "  instance:     {} bytes", size)?;
        }
        if let (Some(element), Some(stride)) = (&self.element, self.stride) {
            writeln!(
                f,
                "  element:      {} (stride {}, {})",
                element,
                stride,
                if self.flattened_array { "flattened" } else { "boxed" }
            )?;
        }
        for field in &self.fields {
            writeln!(
                f,
                "  +{:<4} {:<6} {:<10} {} bytes{}",
                field.offset,
                field.name,
                field.kind,
                field.size,
                if field.flattened { " [flat]" } else { "" }
            )?;
        }
        Ok(())
    }
}
