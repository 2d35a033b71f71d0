//! Pascal VOC XML, one `{split}/labels/{stem}.xml` per image.

use std::fmt::Write;

use super::{label_path, require_class, require_size, Artifact, ExportFormat, Exporter};
use crate::error::BoxforgeError;
use crate::ir::{ClassList, ImageSize, LabeledImage};
use crate::split::DatasetSplit;

const DATABASE: &str = "boxforge";

#[derive(Clone, Copy, Debug, Default)]
pub struct VocExporter;

impl Exporter for VocExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Voc
    }

    fn export(
        &self,
        split: &DatasetSplit,
        classes: &ClassList,
    ) -> Result<Vec<Artifact>, BoxforgeError> {
        split
            .images
            .iter()
            .map(|image| {
                let size = require_size(image)?;
                for bbox in &image.boxes {
                    require_class(classes, image, bbox)?;
                }
                let xml = voc_xml(image, size).map_err(|err| BoxforgeError::Export {
                    message: format!("formatting VOC XML for {}: {err}", image.id),
                })?;
                Ok(Artifact::new(label_path(split, image, "xml"), xml))
            })
            .collect()
    }
}

fn voc_xml(image: &LabeledImage, size: ImageSize) -> Result<String, std::fmt::Error> {
    let file_name = xml_escape(&image.file_name);
    let mut xml = String::new();

    writeln!(xml, "<?xml version=\"1.0\"?>")?;
    writeln!(xml, "<annotation>")?;
    writeln!(xml, "  <folder>images</folder>")?;
    writeln!(xml, "  <filename>{file_name}</filename>")?;
    writeln!(xml, "  <path>{file_name}</path>")?;
    writeln!(xml, "  <source>")?;
    writeln!(xml, "    <database>{DATABASE}</database>")?;
    writeln!(xml, "  </source>")?;
    writeln!(xml, "  <size>")?;
    writeln!(xml, "    <width>{}</width>", size.width)?;
    writeln!(xml, "    <height>{}</height>", size.height)?;
    writeln!(xml, "    <depth>3</depth>")?;
    writeln!(xml, "  </size>")?;
    writeln!(xml, "  <segmented>0</segmented>")?;

    for bbox in &image.boxes {
        writeln!(xml, "  <object>")?;
        writeln!(xml, "    <name>{}</name>", xml_escape(&bbox.class_name))?;
        writeln!(xml, "    <pose>Unspecified</pose>")?;
        writeln!(xml, "    <truncated>0</truncated>")?;
        writeln!(xml, "    <difficult>0</difficult>")?;
        writeln!(xml, "    <bndbox>")?;
        writeln!(xml, "      <xmin>{}</xmin>", bbox.x.round() as i64)?;
        writeln!(xml, "      <ymin>{}</ymin>", bbox.y.round() as i64)?;
        writeln!(xml, "      <xmax>{}</xmax>", (bbox.x + bbox.width).round() as i64)?;
        writeln!(xml, "      <ymax>{}</ymax>", (bbox.y + bbox.height).round() as i64)?;
        writeln!(xml, "    </bndbox>")?;
        writeln!(xml, "  </object>")?;
    }

    write!(xml, "</annotation>")?;
    Ok(xml)
}

fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::{image, split};
    use crate::split::SplitName;

    #[test]
    fn writes_rounded_boxes_and_escaped_names() {
        let classes = ClassList::from_names(["cat & dog"]);
        let split = split(
            SplitName::Test,
            vec![image("pets", 100, 80, &[(10.4, 20.6, 30.2, 40.5, "cat & dog")])],
        );

        let artifacts = VocExporter.export(&split, &classes).unwrap();
        assert_eq!(artifacts[0].path, "test/labels/pets.xml");
        let xml = artifacts[0].text();
        assert!(xml.starts_with("<?xml version=\"1.0\"?>\n<annotation>"));
        assert!(xml.contains("<filename>pets.jpg</filename>"));
        assert!(xml.contains("<depth>3</depth>"));
        assert!(xml.contains("<name>cat &amp; dog</name>"));
        assert!(xml.contains("<xmin>10</xmin>"));
        assert!(xml.contains("<ymin>21</ymin>"));
        assert!(xml.contains("<xmax>41</xmax>"));
        assert!(xml.contains("<ymax>61</ymax>"));
        assert!(xml.ends_with("</annotation>"));
    }

    #[test]
    fn escape_handles_all_entities() {
        assert_eq!(xml_escape("<a href=\"x\">'&'</a>"), "&lt;a href=&quot;x&quot;&gt;&apos;&amp;&apos;&lt;/a&gt;");
    }
}
