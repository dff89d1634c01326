/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use xml::{
    writer::{EventWriter, XmlEvent},
    EmitterConfig,
};

use crate::service::{RetrieveOptions, WaitOptions};
use crate::types::{
    ContinuationToken, Cursor, FilterHandle, ManagedObjectHandle, Scope,
    WatchSpec,
};

/// A vim25 method call, rendered as the `SOAP-ENV:Body` of a request.
pub(crate) enum Request<'a> {
    RetrieveServiceContent,
    Login {
        session_manager: &'a ManagedObjectHandle,
        username: &'a str,
        password: &'a str,
    },
    Logout {
        session_manager: &'a ManagedObjectHandle,
    },
    CreateFilter {
        collector: &'a ManagedObjectHandle,
        spec: &'a WatchSpec,
        partial_updates: bool,
    },
    DestroyPropertyFilter {
        filter: &'a FilterHandle,
    },
    WaitForUpdatesEx {
        collector: &'a ManagedObjectHandle,
        version: &'a Cursor,
        options: &'a WaitOptions,
    },
    RetrievePropertiesEx {
        collector: &'a ManagedObjectHandle,
        spec: &'a WatchSpec,
        options: &'a RetrieveOptions,
    },
    ContinueRetrievePropertiesEx {
        collector: &'a ManagedObjectHandle,
        token: &'a ContinuationToken,
    },
}

impl<'a> Request<'a> {
    pub(crate) fn operation(&self) -> &'static str {
        match self {
            Self::RetrieveServiceContent => "RetrieveServiceContent",
            Self::Login { .. } => "Login",
            Self::Logout { .. } => "Logout",
            Self::CreateFilter { .. } => "CreateFilter",
            Self::DestroyPropertyFilter { .. } => "DestroyPropertyFilter",
            Self::WaitForUpdatesEx { .. } => "WaitForUpdatesEx",
            Self::RetrievePropertiesEx { .. } => "RetrievePropertiesEx",
            Self::ContinueRetrievePropertiesEx { .. } => {
                "ContinueRetrievePropertiesEx"
            }
        }
    }

    pub(crate) fn to_string(&self) -> xml::writer::Result<String> {
        // the soap client supplies the envelope
        let mut xml = EventWriter::new_with_config(
            Vec::new(),
            EmitterConfig::new().write_document_declaration(false),
        );
        self.to_xml(&mut xml)?;
        Ok(String::from_utf8_lossy(&xml.into_inner()).to_string())
    }

    fn to_xml<W: Write>(
        &self,
        xml: &mut EventWriter<W>,
    ) -> xml::writer::Result<()> {
        let op = self.operation();
        xml.write(
            XmlEvent::start_element("SOAP-ENV:Body").ns("ns1", "urn:vim25"),
        )?;
        xml.write(
            XmlEvent::start_element(format!("ns1:{}", op).as_str())
                .attr("xsi:type", &format!("ns1:{}RequestType", op)),
        )?;

        match self {
            Self::RetrieveServiceContent => {
                this(xml, &ManagedObjectHandle::new(
                    "ServiceInstance",
                    "ServiceInstance",
                ))?;
            }
            Self::Login {
                session_manager,
                username,
                password,
            } => {
                this(xml, session_manager)?;
                simple_elem(xml, "ns1:userName", username)?;
                simple_elem(xml, "ns1:password", password)?;
            }
            Self::Logout { session_manager } => {
                this(xml, session_manager)?;
            }
            Self::CreateFilter {
                collector,
                spec,
                partial_updates,
            } => {
                this(xml, collector)?;
                filter_spec(xml, "ns1:spec", spec)?;
                simple_elem(
                    xml,
                    "ns1:partialUpdates",
                    bool_str(*partial_updates),
                )?;
            }
            Self::DestroyPropertyFilter { filter } => {
                this(xml, filter.handle())?;
            }
            Self::WaitForUpdatesEx {
                collector,
                version,
                options,
            } => {
                this(xml, collector)?;
                simple_elem(xml, "ns1:version", version.as_str())?;
                xml.write(XmlEvent::start_element("ns1:options"))?;
                if let Some(n) = options.max_wait_seconds {
                    simple_elem(xml, "ns1:maxWaitSeconds", &n.to_string())?;
                }
                if let Some(n) = options.max_object_updates {
                    simple_elem(xml, "ns1:maxObjectUpdates", &n.to_string())?;
                }
                xml.write(XmlEvent::end_element())?; // ns1:options
            }
            Self::RetrievePropertiesEx {
                collector,
                spec,
                options,
            } => {
                this(xml, collector)?;
                filter_spec(xml, "ns1:specSet", spec)?;
                xml.write(XmlEvent::start_element("ns1:options"))?;
                if let Some(n) = options.max_objects {
                    simple_elem(xml, "ns1:maxObjects", &n.to_string())?;
                }
                xml.write(XmlEvent::end_element())?; // ns1:options
            }
            Self::ContinueRetrievePropertiesEx { collector, token } => {
                this(xml, collector)?;
                simple_elem(xml, "ns1:token", token.as_str())?;
            }
        }

        xml.write(XmlEvent::end_element())?; // ns1:{op}
        xml.write(XmlEvent::end_element())?; // SOAP-ENV:Body
        Ok(())
    }
}

/// A `PropertyFilterSpec`. Property sets are merged per object type; an
/// entry without paths selects all properties of its type.
fn filter_spec<W: Write>(
    xml: &mut EventWriter<W>,
    elem: &str,
    spec: &WatchSpec,
) -> xml::writer::Result<()> {
    let mut prop_sets: BTreeMap<&str, Option<BTreeSet<&str>>> =
        BTreeMap::new();
    for entry in spec.entries() {
        let set = prop_sets
            .entry(entry.scope.object_type())
            .or_insert_with(|| Some(BTreeSet::new()));
        match entry.paths.is_empty() {
            true => *set = None,
            false => {
                if let Some(paths) = set {
                    paths.extend(entry.paths.iter().map(|p| p.as_str()));
                }
            }
        }
    }

    xml.write(XmlEvent::start_element(elem))?;
    for (typ, paths) in &prop_sets {
        xml.write(XmlEvent::start_element("ns1:propSet"))?;
        simple_elem(xml, "ns1:type", typ)?;
        match paths {
            None => simple_elem(xml, "ns1:all", "true")?,
            Some(paths) => {
                for path in paths {
                    simple_elem(xml, "ns1:pathSet", path)?;
                }
            }
        }
        xml.write(XmlEvent::end_element())?; // ns1:propSet
    }
    for entry in spec.entries() {
        match &entry.scope {
            Scope::Object(handle) => {
                xml.write(XmlEvent::start_element("ns1:objectSet"))?;
                obj(xml, handle)?;
                simple_elem(xml, "ns1:skip", "false")?;
                xml.write(XmlEvent::end_element())?; // ns1:objectSet
            }
            Scope::Container { container, .. } => {
                inventory_object_set(xml, container)?;
            }
        }
    }
    xml.write(XmlEvent::end_element())
}

/// Object set reaching every inventory object below `container`. The
/// container itself is skipped.
fn inventory_object_set<W: Write>(
    xml: &mut EventWriter<W>,
    container: &ManagedObjectHandle,
) -> xml::writer::Result<()> {
    xml.write(XmlEvent::start_element("ns1:objectSet"))?;
    obj(xml, container)?;
    simple_elem(xml, "ns1:skip", "true")?;
    traversal_spec(
        xml,
        "visitFolders",
        "Folder",
        "childEntity",
        &[
            "visitFolders",
            "dcToHf",
            "dcToVmf",
            "crToH",
            "crToRp",
            "dcToDs",
            "hToVm",
            "rpToVm",
        ],
    )?;
    traversal_spec(xml, "dcToVmf", "Datacenter", "vmFolder", &["visitFolders"])?;
    traversal_spec(xml, "dcToDs", "Datacenter", "datastore", &["visitFolders"])?;
    traversal_spec(xml, "dcToHf", "Datacenter", "hostFolder", &["visitFolders"])?;
    traversal_spec(xml, "crToH", "ComputeResource", "host", &[])?;
    traversal_spec(
        xml,
        "crToRp",
        "ComputeResource",
        "resourcePool",
        &["rpToRp", "rpToVm"],
    )?;
    traversal_spec(
        xml,
        "rpToRp",
        "ResourcePool",
        "resourcePool",
        &["rpToRp", "rpToVm"],
    )?;
    traversal_spec(xml, "hToVm", "HostSystem", "vm", &["visitFolders"])?;
    traversal_spec(xml, "rpToVm", "ResourcePool", "vm", &[])?;
    xml.write(XmlEvent::end_element())
}

fn traversal_spec<W: Write>(
    xml: &mut EventWriter<W>,
    name: &str,
    typ: &str,
    path: &str,
    select_sets: &[&str],
) -> xml::writer::Result<()> {
    xml.write(
        XmlEvent::start_element("ns1:selectSet")
            .attr("xsi:type", "ns1:TraversalSpec"),
    )?;
    simple_elem(xml, "ns1:name", name)?;
    simple_elem(xml, "ns1:type", typ)?;
    simple_elem(xml, "ns1:path", path)?;
    simple_elem(xml, "ns1:skip", "false")?;
    for set in select_sets {
        xml.write(XmlEvent::start_element("ns1:selectSet"))?;
        simple_elem(xml, "ns1:name", set)?;
        xml.write(XmlEvent::end_element())?;
    }
    xml.write(XmlEvent::end_element())
}

fn this<W: Write>(
    xml: &mut EventWriter<W>,
    handle: &ManagedObjectHandle,
) -> xml::writer::Result<()> {
    reference(xml, "ns1:_this", handle)
}

fn obj<W: Write>(
    xml: &mut EventWriter<W>,
    handle: &ManagedObjectHandle,
) -> xml::writer::Result<()> {
    reference(xml, "ns1:obj", handle)
}

fn reference<W: Write>(
    xml: &mut EventWriter<W>,
    elem: &str,
    handle: &ManagedObjectHandle,
) -> xml::writer::Result<()> {
    xml.write(XmlEvent::start_element(elem).attr("type", &handle.r#type))?;
    xml.write(XmlEvent::characters(&handle.value))?;
    xml.write(XmlEvent::end_element())
}

fn simple_elem<W: Write>(
    xml: &mut EventWriter<W>,
    elem: &str,
    value: &str,
) -> xml::writer::Result<()> {
    xml.write(XmlEvent::start_element(elem))?;
    xml.write(XmlEvent::characters(value))?;
    xml.write(XmlEvent::end_element())
}

fn bool_str(b: bool) -> &'static str {
    match b {
        true => "true",
        false => "false",
    }
}
