//! Class table
//!
//! The fixed set of classes the local runtime knows: the engine's
//! configuration, context and collection classes, the helper class, and the
//! two core classes everything else refers to. `ClassRef` and `MethodRef`
//! values are table indexes + 1.

use ember_sdk::{ClassRef, MethodKind, MethodRef, RawRef};

/// Root class
pub const OBJECT_CLASS: &str = "java/lang/Object";

/// Engine configuration class
pub const CONF_CLASS: &str = "org/apache/spark/SparkConf";

/// Engine context class
pub const CONTEXT_CLASS: &str = "org/apache/spark/api/java/JavaSparkContext";

/// Distributed collection class
pub const COLLECTION_CLASS: &str = "org/apache/spark/api/java/JavaRDD";

/// Native behavior behind a method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `SparkConf.<init>()V`
    ConfInit,
    /// `SparkConf.setAppName(String)`
    SetAppName,
    /// `SparkConf.get("spark.app.name")`, exposed as `getAppName()`
    ConfAppName,
    /// `JavaSparkContext.<init>(SparkConf)`
    ContextInit,
    /// `JavaSparkContext.appName()`
    ContextAppName,
    /// `Helper.parallelize(JavaSparkContext, int[])`
    Parallelize,
    /// `Helper.map(JavaRDD, byte[])`
    Map,
    /// `Helper.collect(JavaRDD)`
    Collect,
}

/// One method of a class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDef {
    /// Index of the declaring class
    pub class: usize,
    /// Method name (`<init>` for constructors)
    pub name: &'static str,
    /// Descriptor string
    pub descriptor: &'static str,
    /// Static or instance
    pub kind: MethodKind,
    /// What the method does
    pub builtin: Builtin,
}

impl MethodDef {
    /// Whether this is a constructor
    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }
}

#[derive(Debug)]
struct ClassDef {
    name: String,
}

/// All classes and methods of a local runtime
#[derive(Debug)]
pub struct ClassTable {
    classes: Vec<ClassDef>,
    methods: Vec<MethodDef>,
}

impl ClassTable {
    /// The standard table, with the helper class registered as `helper_class`
    pub fn standard(helper_class: &str) -> Self {
        let mut table = Self {
            classes: Vec::new(),
            methods: Vec::new(),
        };

        table.define_class(OBJECT_CLASS);
        table.define_class(crate::heap::STRING_CLASS);
        table.define_class(COLLECTION_CLASS);

        let conf = table.define_class(CONF_CLASS);
        table.define_method(conf, "<init>", "()V", MethodKind::Instance, Builtin::ConfInit);
        table.define_method(
            conf,
            "setAppName",
            "(Ljava/lang/String;)Lorg/apache/spark/SparkConf;",
            MethodKind::Instance,
            Builtin::SetAppName,
        );
        table.define_method(
            conf,
            "getAppName",
            "()Ljava/lang/String;",
            MethodKind::Instance,
            Builtin::ConfAppName,
        );

        let context = table.define_class(CONTEXT_CLASS);
        table.define_method(
            context,
            "<init>",
            "(Lorg/apache/spark/SparkConf;)V",
            MethodKind::Instance,
            Builtin::ContextInit,
        );
        table.define_method(
            context,
            "appName",
            "()Ljava/lang/String;",
            MethodKind::Instance,
            Builtin::ContextAppName,
        );

        let helper = table.define_class(helper_class);
        table.define_method(
            helper,
            "parallelize",
            "(Lorg/apache/spark/api/java/JavaSparkContext;[I)Lorg/apache/spark/api/java/JavaRDD;",
            MethodKind::Static,
            Builtin::Parallelize,
        );
        table.define_method(
            helper,
            "map",
            "(Lorg/apache/spark/api/java/JavaRDD;[B)Lorg/apache/spark/api/java/JavaRDD;",
            MethodKind::Static,
            Builtin::Map,
        );
        table.define_method(
            helper,
            "collect",
            "(Lorg/apache/spark/api/java/JavaRDD;)[I",
            MethodKind::Static,
            Builtin::Collect,
        );

        table
    }

    fn define_class(&mut self, name: &str) -> usize {
        self.classes.push(ClassDef {
            name: name.to_string(),
        });
        self.classes.len() - 1
    }

    fn define_method(
        &mut self,
        class: usize,
        name: &'static str,
        descriptor: &'static str,
        kind: MethodKind,
        builtin: Builtin,
    ) {
        self.methods.push(MethodDef {
            class,
            name,
            descriptor,
            kind,
            builtin,
        });
    }

    /// Look up a class by slash-separated name
    pub fn find_class(&self, name: &str) -> Option<ClassRef> {
        let index = self.classes.iter().position(|c| c.name == name)?;
        ClassRef::from_raw(index as RawRef + 1)
    }

    /// Name of a class
    pub fn class_name(&self, class: ClassRef) -> Option<&str> {
        let index = (class.to_raw() as usize).checked_sub(1)?;
        self.class_name_at(index)
    }

    /// Name of the class at a table index
    pub fn class_name_at(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(|c| c.name.as_str())
    }

    /// Look up a method declared by `class`
    pub fn find_method(
        &self,
        class: ClassRef,
        name: &str,
        descriptor: &str,
        kind: MethodKind,
    ) -> Option<MethodRef> {
        let class = (class.to_raw() as usize).checked_sub(1)?;
        let index = self.methods.iter().position(|m| {
            m.class == class && m.name == name && m.descriptor == descriptor && m.kind == kind
        })?;
        MethodRef::from_raw(index as RawRef + 1, kind)
    }

    /// Definition of a method
    pub fn method(&self, method: MethodRef) -> Option<&MethodDef> {
        let index = (method.to_raw() as usize).checked_sub(1)?;
        self.methods.get(index)
    }

    /// Number of classes
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table() {
        let table = ClassTable::standard("Helper");
        let conf = table.find_class(CONF_CLASS).unwrap();
        assert_eq!(table.class_name(conf), Some(CONF_CLASS));

        let ctor = table
            .find_method(conf, "<init>", "()V", MethodKind::Instance)
            .unwrap();
        let def = table.method(ctor).unwrap();
        assert!(def.is_constructor());
        assert_eq!(def.builtin, Builtin::ConfInit);

        // kind is part of the key
        assert!(table
            .find_method(conf, "<init>", "()V", MethodKind::Static)
            .is_none());
        // so is the descriptor
        assert!(table
            .find_method(conf, "setAppName", "(Ljava/lang/String;)V", MethodKind::Instance)
            .is_none());
    }

    #[test]
    fn test_helper_name_is_configurable() {
        let table = ClassTable::standard("com/acme/SparkHelper");
        assert!(table.find_class("Helper").is_none());
        let helper = table.find_class("com/acme/SparkHelper").unwrap();
        let collect = table
            .find_method(
                helper,
                "collect",
                "(Lorg/apache/spark/api/java/JavaRDD;)[I",
                MethodKind::Static,
            )
            .unwrap();
        assert!(collect.kind().is_static());
    }
}
